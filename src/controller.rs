use crate::animation::{AnimatedNode, AnimationEngine, TransitionState};
use crate::canvas::{draw_edges, draw_edges_animated, Surface};
use crate::config::Config;
use crate::ir::{EdgeStyle, Graph};
use crate::layout::{compute_layout, Layout, Rect};
use crate::measure::{measure_nodes, RectProvider};
use crate::scheduler::{FrameHandle, FrameScheduler, ManualScheduler};
use std::collections::BTreeMap;

// Nominal 60hz tick for manual pumping.
const FRAME_STEP_MS: f64 = 16.0;

/// Orchestrates the plex pipeline: layout on every render-relevant change,
/// deferred box measurement, animated transitions on navigation, snapped
/// commits on resize, and the frame loop that keeps the node layer and the
/// edge surface in lockstep.
///
/// The host owns the rendering backend; the controller tells it when to
/// apply node states (always before edges are drawn) and drives the edge
/// surface itself.
pub struct PlexController<P: RectProvider, F: FrameScheduler> {
    graph: Graph,
    active_id: String,
    theme: crate::theme::Theme,
    edge_style: EdgeStyle,
    layout_config: crate::config::LayoutConfig,
    motion: crate::config::MotionConfig,
    engine: AnimationEngine,
    provider: P,
    scheduler: F,
    viewport: (f32, f32),
    device_scale: f32,
    layout: Layout,
    rects: BTreeMap<String, Rect>,
    transition_start: Option<f64>,
    pending_frame: Option<FrameHandle>,
    measure_deadlines: Vec<f64>,
}

impl<P: RectProvider, F: FrameScheduler> PlexController<P, F> {
    pub fn new(
        graph: Graph,
        active_id: &str,
        config: &Config,
        edge_style: EdgeStyle,
        provider: P,
        scheduler: F,
    ) -> Self {
        Self {
            graph,
            active_id: active_id.to_string(),
            theme: config.theme.clone(),
            edge_style,
            layout_config: config.layout.clone(),
            motion: config.motion.clone(),
            engine: AnimationEngine::new(config.motion.clone()),
            provider,
            scheduler,
            viewport: (0.0, 0.0),
            device_scale: 1.0,
            layout: Layout::default(),
            rects: BTreeMap::new(),
            transition_start: None,
            pending_frame: None,
            measure_deadlines: Vec::new(),
        }
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn rects(&self) -> &BTreeMap<String, Rect> {
        &self.rects
    }

    pub fn state(&self) -> TransitionState {
        self.engine.state()
    }

    pub fn set_device_scale(&mut self, scale: f32) {
        self.device_scale = scale;
    }

    fn recompute_layout(&mut self) {
        self.layout = compute_layout(
            &self.graph,
            &self.active_id,
            self.viewport.0,
            self.viewport.1,
            &self.layout_config,
        );
    }

    fn layout_ids(&self) -> Vec<String> {
        self.layout.positions.iter().map(|p| p.id.clone()).collect()
    }

    fn has_viewport(&self) -> bool {
        self.viewport.0 > 0.0 && self.viewport.1 > 0.0
    }

    fn restart_frame(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.pending_frame = Some(self.scheduler.request_frame());
    }

    fn ensure_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
    }

    fn schedule_measure(&mut self, delay_ms: f64) {
        let deadline = self.scheduler.now_ms() + delay_ms;
        self.measure_deadlines.push(deadline);
        self.ensure_frame();
    }

    /// Resize (or initial mount): recompute, snap with no animation, then
    /// measure once the host has had a frame to apply the new positions.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        self.recompute_layout();
        self.transition_start = None;
        self.rects = self.engine.snap_to(&self.layout.positions);
        if self.has_viewport() {
            self.schedule_measure(self.motion.measure_delay_ms);
            self.restart_frame();
        }
    }

    /// Replace the node set without navigating; positions snap.
    pub fn set_graph(&mut self, graph: Graph) {
        self.graph = graph;
        self.recompute_layout();
        self.transition_start = None;
        self.rects = self.engine.snap_to(&self.layout.positions);
        if self.has_viewport() {
            self.schedule_measure(self.motion.measure_delay_ms);
            self.restart_frame();
        }
    }

    /// Navigate to a node: animate from wherever nodes are right now to the
    /// new layout. Supersedes any transition already running.
    pub fn navigate(&mut self, node_id: &str) {
        if node_id == self.active_id {
            return;
        }
        self.active_id = node_id.to_string();
        self.recompute_layout();

        let duration = self.theme.transition_duration;
        self.engine.begin_transition(
            &self.layout.positions,
            self.layout.edges.clone(),
            duration,
        );
        self.transition_start = Some(self.scheduler.now_ms());

        if self.has_viewport() {
            // One early measure so freshly entered nodes get real boxes, and
            // one after settling to catch late layout (fonts, wrapping).
            self.schedule_measure(self.motion.measure_delay_ms);
            self.schedule_measure(duration as f64 + self.motion.measure_delay_ms);
            self.restart_frame();
        }
    }

    fn run_due_measures(&mut self, now: f64) {
        if self.measure_deadlines.iter().all(|d| *d > now) {
            return;
        }
        self.measure_deadlines.retain(|d| *d > now);
        let ids = self.layout_ids();
        let measured = measure_nodes(&self.provider, &ids);
        for rect in measured.values() {
            self.engine.cache_dimensions(&rect.id, rect.width, rect.height);
        }
        if self.engine.state() == TransitionState::Idle {
            // Settled: measured boxes become the authoritative edge anchors.
            self.rects.extend(measured);
        }
    }

    /// Frame callback entry point. The host calls this for every frame it
    /// granted via the scheduler, passing the edge surface and a sink that
    /// applies per-node visual state to the retained node layer.
    ///
    /// Node states are always applied before any edge is drawn, so the two
    /// surfaces can never desynchronize within a frame.
    pub fn on_frame(
        &mut self,
        surface: &mut dyn Surface,
        apply_nodes: &mut dyn FnMut(&[AnimatedNode]),
    ) -> TransitionState {
        self.pending_frame = None;
        if !self.has_viewport() {
            return TransitionState::Idle;
        }

        let now = self.scheduler.now_ms();
        self.run_due_measures(now);

        let Some(start) = self.transition_start else {
            draw_edges(
                surface,
                &self.layout.edges,
                &self.rects,
                &self.theme,
                self.edge_style,
                self.device_scale,
            );
            if !self.measure_deadlines.is_empty() {
                self.ensure_frame();
            }
            return TransitionState::Idle;
        };

        let frame = self.engine.frame(now - start);
        apply_nodes(&frame.nodes);
        draw_edges_animated(
            surface,
            &frame.edges,
            &frame.rects,
            &self.theme,
            self.edge_style,
            self.device_scale,
            frame.progress,
            &frame.alphas(),
            &self.motion,
        );

        if frame.done() {
            self.transition_start = None;
            self.rects = frame.rects;
            if !self.measure_deadlines.is_empty() {
                self.ensure_frame();
            }
            TransitionState::Settled
        } else {
            self.ensure_frame();
            TransitionState::Running
        }
    }

    /// Teardown: stop the frame callback before anything else goes away.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.engine.cancel();
        self.measure_deadlines.clear();
    }
}

impl<P: RectProvider> PlexController<P, ManualScheduler> {
    /// Headless drive: consume the pending frame request if there is one,
    /// run it, and tick the manual clock. Returns false once no frame is
    /// pending, i.e. the controller has gone quiet.
    pub fn pump_frame(
        &mut self,
        surface: &mut dyn Surface,
        apply_nodes: &mut dyn FnMut(&[AnimatedNode]),
    ) -> bool {
        if self.scheduler.take_frame().is_none() {
            return false;
        }
        self.on_frame(surface, apply_nodes);
        self.scheduler.advance(FRAME_STEP_MS);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawOp, RecordingSurface};
    use crate::ir::Node;
    use crate::measure::FixedRectProvider;
    use crate::scheduler::ManualScheduler;

    fn sample_graph() -> Graph {
        Graph::new(vec![
            Node::with_children("root", "Root", &["a", "b"]),
            Node::with_children("a", "A", &["x"]),
            Node::new("b", "B"),
            Node::new("x", "X"),
        ])
    }

    fn controller() -> PlexController<FixedRectProvider, ManualScheduler> {
        let mut provider = FixedRectProvider::default();
        for id in ["root", "a", "b", "x"] {
            provider.insert(Rect::from_center(id, 0.0, 0.0, 140.0, 40.0));
        }
        PlexController::new(
            sample_graph(),
            "root",
            &Config::default(),
            EdgeStyle::Waterfall,
            provider,
            ManualScheduler::new(),
        )
    }

    /// Pump pending frames, advancing the clock between them, until the
    /// controller goes idle or `max_frames` elapses.
    fn pump(
        controller: &mut PlexController<FixedRectProvider, ManualScheduler>,
        max_frames: usize,
    ) -> Vec<TransitionState> {
        let mut states = Vec::new();
        for _ in 0..max_frames {
            if controller.scheduler.take_frame().is_none() {
                break;
            }
            let mut surface = RecordingSurface::new(800.0, 600.0);
            let state = controller.on_frame(&mut surface, &mut |_| {});
            states.push(state);
            controller.scheduler.advance(16.0);
        }
        states
    }

    #[test]
    fn mount_snaps_without_animation() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        assert_eq!(controller.state(), TransitionState::Idle);
        assert_eq!(controller.layout().positions.len(), 3);
        // Snapshot rects exist immediately, from fallback dimensions.
        assert_eq!(controller.rects()["root"].width, 120.0);

        let states = pump(&mut controller, 10);
        assert!(states.iter().all(|s| *s == TransitionState::Idle));
    }

    #[test]
    fn navigation_runs_to_settled() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        pump(&mut controller, 10);

        controller.navigate("a");
        assert_eq!(controller.state(), TransitionState::Running);
        let states = pump(&mut controller, 60);
        assert!(states.contains(&TransitionState::Settled));
        assert_eq!(controller.state(), TransitionState::Idle);
        assert_eq!(controller.active_id(), "a");
        // New layout: root parent, a active, x child.
        assert!(controller.layout().position("x").is_some());
    }

    #[test]
    fn nodes_apply_before_edges_draw() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        pump(&mut controller, 10);
        controller.navigate("a");
        controller.scheduler.take_frame().unwrap();

        let mut surface = RecordingSurface::new(800.0, 600.0);
        let mut ops_at_apply = None;
        // The surface op log must still be empty when node states arrive.
        let mut node_count = 0;
        controller.on_frame(&mut surface, &mut |nodes| {
            node_count = nodes.len();
            ops_at_apply = Some(0usize);
        });
        assert_eq!(ops_at_apply, Some(0));
        assert!(node_count > 0);
        assert!(surface.ops.contains(&DrawOp::Clear));
    }

    #[test]
    fn measurement_feeds_dimension_cache() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        // Before the measure deadline, fallback dims.
        assert_eq!(controller.rects()["root"].width, 120.0);

        controller.scheduler.advance(60.0);
        pump(&mut controller, 4);
        // Measured 140x40 boxes replace the fallback.
        assert_eq!(controller.rects()["root"].width, 140.0);
        assert_eq!(controller.rects()["root"].height, 40.0);
    }

    #[test]
    fn rapid_navigation_supersedes_without_settling_the_first() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        pump(&mut controller, 10);

        controller.navigate("a");
        // A few frames in, navigate again before settling.
        for _ in 0..3 {
            controller.scheduler.take_frame().unwrap();
            let mut surface = RecordingSurface::new(800.0, 600.0);
            let state = controller.on_frame(&mut surface, &mut |_| {});
            assert_eq!(state, TransitionState::Running);
            controller.scheduler.advance(16.0);
        }
        controller.navigate("b");
        let states = pump(&mut controller, 60);
        // Exactly one settle, from the superseding transition.
        assert_eq!(
            states
                .iter()
                .filter(|s| **s == TransitionState::Settled)
                .count(),
            1
        );
        assert_eq!(controller.active_id(), "b");
    }

    #[test]
    fn resize_mid_transition_snaps() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        pump(&mut controller, 10);
        controller.navigate("a");
        pump(&mut controller, 2);

        controller.set_viewport(1000.0, 700.0);
        assert_eq!(controller.state(), TransitionState::Idle);
        assert_eq!(
            controller.layout().position("a").map(|p| p.x),
            Some(500.0)
        );
    }

    #[test]
    fn zero_viewport_suppresses_rendering() {
        let mut controller = controller();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let state = controller.on_frame(&mut surface, &mut |_| {});
        assert_eq!(state, TransitionState::Idle);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn shutdown_cancels_pending_frame() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        assert!(controller.scheduler.has_pending_frame());
        controller.shutdown();
        assert!(!controller.scheduler.has_pending_frame());
        assert_eq!(controller.state(), TransitionState::Idle);
    }

    #[test]
    fn navigating_to_current_node_is_a_no_op() {
        let mut controller = controller();
        controller.set_viewport(800.0, 600.0);
        pump(&mut controller, 10);
        controller.navigate("root");
        assert_eq!(controller.state(), TransitionState::Idle);
    }
}
