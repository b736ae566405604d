/// Opaque handle to a scheduled frame callback.
pub type FrameHandle = u64;

/// Injectable "run before the next repaint" capability.
///
/// A browser-style host maps `request_frame` onto its display-synchronized
/// callback; non-interactive hosts substitute a fixed-interval timer or the
/// manual pump below. One request produces at most one frame; the controller
/// re-requests while a transition runs and cancels on supersede or teardown.
pub trait FrameScheduler {
    /// Monotonic clock, milliseconds.
    fn now_ms(&self) -> f64;
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Hand-cranked scheduler for tests and headless frame dumps: the caller
/// advances the clock and pumps pending frames explicitly.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: f64,
    next_handle: FrameHandle,
    pending: Option<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: f64) {
        self.now += ms;
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the pending frame request, if any. The caller then invokes
    /// the controller's frame entry point.
    pub fn take_frame(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl FrameScheduler for ManualScheduler {
    fn now_ms(&self) -> f64 {
        self.now
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        self.pending = Some(self.next_handle);
        self.next_handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}
