use crate::config::MotionConfig;
use crate::ir::Role;
use crate::layout::{EdgeDef, NodePosition, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Enter/exit styling: entering nodes grow 0.85 -> 1, exiting shrink 1 -> 0.9.
const ENTER_SCALE_FROM: f32 = 0.85;
const EXIT_SCALE_DROP: f32 = 0.1;

/// Cubic ease-out: fast start, slow settle.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Linear interpolation between two scalars.
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Idle,
    Running,
    /// Reported on the frame that commits; the engine itself is back to
    /// `Idle` by the time the caller sees this.
    Settled,
}

/// How a node participates in the current transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimKind {
    /// Present before and after: slides between the two points.
    Moving,
    /// New this layout: fades/scales in at its target point.
    Entering,
    /// Gone from the new layout: fades out in place.
    Exiting,
}

#[derive(Debug, Clone)]
struct NodeAnim {
    from: (f32, f32),
    to: (f32, f32),
    role: Role,
    kind: AnimKind,
}

/// Last committed, settled position of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotPoint {
    pub x: f32,
    pub y: f32,
    pub role: Role,
}

/// Per-frame visual state for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatedNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub scale: f32,
    pub role: Role,
}

/// Everything one frame needs to paint: node states first, then edge rects,
/// in that order, so the two surfaces never desynchronize.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    pub nodes: Vec<AnimatedNode>,
    pub rects: BTreeMap<String, Rect>,
    pub edges: Vec<EdgeDef>,
    /// Eased progress, what the edge reveal consumes.
    pub progress: f32,
    pub raw_progress: f32,
    pub state: TransitionState,
}

impl FrameUpdate {
    fn idle() -> Self {
        Self {
            nodes: Vec::new(),
            rects: BTreeMap::new(),
            edges: Vec::new(),
            progress: 0.0,
            raw_progress: 0.0,
            state: TransitionState::Idle,
        }
    }

    pub fn done(&self) -> bool {
        self.state == TransitionState::Settled
    }

    /// Per-node opacity, for edge alpha = min(source, target).
    pub fn alphas(&self) -> BTreeMap<String, f32> {
        self.nodes
            .iter()
            .map(|node| (node.id.clone(), node.opacity))
            .collect()
    }
}

#[derive(Debug)]
struct Transition {
    anims: BTreeMap<String, NodeAnim>,
    target: Vec<NodePosition>,
    edges: Vec<EdgeDef>,
    duration: f32,
    last_eased: f32,
}

/// Drives one transition at a time between committed layouts.
///
/// Owns the settled-position snapshot and the per-node dimension cache;
/// everything else only reads values returned from calls. Time is supplied by
/// the caller as milliseconds since the transition began, so any frame source
/// (display callback, fixed timer, manual pump) can drive it.
#[derive(Debug)]
pub struct AnimationEngine {
    snapshot: BTreeMap<String, SnapshotPoint>,
    dims: BTreeMap<String, (f32, f32)>,
    transition: Option<Transition>,
    motion: MotionConfig,
}

impl AnimationEngine {
    pub fn new(motion: MotionConfig) -> Self {
        Self {
            snapshot: BTreeMap::new(),
            dims: BTreeMap::new(),
            transition: None,
            motion,
        }
    }

    pub fn state(&self) -> TransitionState {
        if self.transition.is_some() {
            TransitionState::Running
        } else {
            TransitionState::Idle
        }
    }

    /// Settled positions as of the last commit or force-snap. Mid-transition
    /// values never appear here.
    pub fn snapshot(&self) -> &BTreeMap<String, SnapshotPoint> {
        &self.snapshot
    }

    /// Record a node's measured box size for rect derivation.
    pub fn cache_dimensions(&mut self, id: &str, width: f32, height: f32) {
        self.dims.insert(id.to_string(), (width, height));
    }

    fn dims_of(&self, id: &str) -> (f32, f32) {
        self.dims.get(id).copied().unwrap_or((
            self.motion.fallback_node_width,
            self.motion.fallback_node_height,
        ))
    }

    fn rect_at(&self, id: &str, cx: f32, cy: f32) -> Rect {
        let (width, height) = self.dims_of(id);
        Rect::from_center(id, cx, cy, width, height)
    }

    /// Positions as of right now: mid-flight interpolated points while a
    /// transition runs, the settled snapshot otherwise. This is what a
    /// superseding transition animates from, so rapid navigation stays
    /// continuous instead of snapping back.
    pub fn capture_current_positions(&self) -> BTreeMap<String, SnapshotPoint> {
        let Some(transition) = &self.transition else {
            return self.snapshot.clone();
        };
        let eased = transition.last_eased;
        transition
            .anims
            .iter()
            .map(|(id, anim)| {
                let point = SnapshotPoint {
                    x: lerp(anim.from.0, anim.to.0, eased),
                    y: lerp(anim.from.1, anim.to.1, eased),
                    role: anim.role,
                };
                (id.clone(), point)
            })
            .collect()
    }

    /// Start a transition toward `positions`. A running transition is
    /// cancelled first: no commit, and its captured in-flight points become
    /// the new `from` set.
    pub fn begin_transition(
        &mut self,
        positions: &[NodePosition],
        edges: Vec<EdgeDef>,
        duration_ms: f32,
    ) {
        let prev = self.capture_current_positions();
        self.transition = None;

        let mut anims: BTreeMap<String, NodeAnim> = BTreeMap::new();
        for pos in positions {
            let anim = match prev.get(&pos.id) {
                Some(old) => NodeAnim {
                    from: (old.x, old.y),
                    to: (pos.x, pos.y),
                    role: pos.role,
                    kind: AnimKind::Moving,
                },
                None => NodeAnim {
                    from: (pos.x, pos.y),
                    to: (pos.x, pos.y),
                    role: pos.role,
                    kind: AnimKind::Entering,
                },
            };
            anims.insert(pos.id.clone(), anim);
        }
        for (id, old) in &prev {
            if !anims.contains_key(id) {
                anims.insert(
                    id.clone(),
                    NodeAnim {
                        from: (old.x, old.y),
                        to: (old.x, old.y),
                        role: old.role,
                        kind: AnimKind::Exiting,
                    },
                );
            }
        }

        self.transition = Some(Transition {
            anims,
            target: positions.to_vec(),
            edges,
            duration: duration_ms,
            last_eased: 0.0,
        });
    }

    /// Advance the running transition to `elapsed_ms` and produce the frame.
    /// The frame that reaches progress 1 commits the snapshot (exiting nodes
    /// dropped) and reports `Settled`; afterwards the engine is `Idle`.
    pub fn frame(&mut self, elapsed_ms: f64) -> FrameUpdate {
        let Some(transition) = &mut self.transition else {
            return FrameUpdate::idle();
        };

        let raw = if transition.duration > 0.0 {
            ((elapsed_ms as f32) / transition.duration).min(1.0).max(0.0)
        } else {
            1.0
        };
        let eased = ease_out_cubic(raw);
        transition.last_eased = eased;

        let mut nodes = Vec::with_capacity(transition.anims.len());
        for (id, anim) in &transition.anims {
            let x = lerp(anim.from.0, anim.to.0, eased);
            let y = lerp(anim.from.1, anim.to.1, eased);
            let (opacity, scale) = match anim.kind {
                AnimKind::Moving => (1.0, 1.0),
                AnimKind::Entering => (eased, ENTER_SCALE_FROM + (1.0 - ENTER_SCALE_FROM) * eased),
                AnimKind::Exiting => (1.0 - eased, 1.0 - EXIT_SCALE_DROP * eased),
            };
            nodes.push(AnimatedNode {
                id: id.clone(),
                x,
                y,
                opacity,
                scale,
                role: anim.role,
            });
        }

        let edges = transition.edges.clone();
        let target = if raw >= 1.0 {
            Some(std::mem::take(&mut transition.target))
        } else {
            None
        };

        let rects = nodes
            .iter()
            .map(|node| (node.id.clone(), self.rect_at(&node.id, node.x, node.y)))
            .collect();

        if let Some(target) = target {
            self.commit(&target);
            self.transition = None;
            return FrameUpdate {
                nodes,
                rects,
                edges,
                progress: eased,
                raw_progress: raw,
                state: TransitionState::Settled,
            };
        }

        FrameUpdate {
            nodes,
            rects,
            edges,
            progress: eased,
            raw_progress: raw,
            state: TransitionState::Running,
        }
    }

    /// Non-animated commit for resize and initial mount: overwrite the
    /// snapshot and hand back rects, no frame loop involved.
    pub fn snap_to(&mut self, positions: &[NodePosition]) -> BTreeMap<String, Rect> {
        self.transition = None;
        self.commit(positions);
        positions
            .iter()
            .map(|pos| (pos.id.clone(), self.rect_at(&pos.id, pos.x, pos.y)))
            .collect()
    }

    /// Drop the in-flight transition without committing anything.
    pub fn cancel(&mut self) {
        self.transition = None;
    }

    fn commit(&mut self, positions: &[NodePosition]) {
        self.snapshot = positions
            .iter()
            .map(|pos| {
                (
                    pos.id.clone(),
                    SnapshotPoint {
                        x: pos.x,
                        y: pos.y,
                        role: pos.role,
                    },
                )
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::EdgeKind;

    fn pos(id: &str, x: f32, y: f32, role: Role) -> NodePosition {
        NodePosition {
            id: id.to_string(),
            x,
            y,
            role,
        }
    }

    fn edge(source: &str, target: &str, kind: EdgeKind) -> EdgeDef {
        EdgeDef {
            source_id: source.to_string(),
            target_id: target.to_string(),
            kind,
        }
    }

    fn engine() -> AnimationEngine {
        AnimationEngine::new(MotionConfig::default())
    }

    fn node<'a>(frame: &'a FrameUpdate, id: &str) -> &'a AnimatedNode {
        frame.nodes.iter().find(|n| n.id == id).unwrap()
    }

    #[test]
    fn classification_covers_union_of_old_and_new() {
        let mut engine = engine();
        engine.snap_to(&[
            pos("stay", 0.0, 0.0, Role::Active),
            pos("leave", 100.0, 0.0, Role::Child),
        ]);
        engine.begin_transition(
            &[
                pos("stay", 50.0, 50.0, Role::Parent),
                pos("arrive", 10.0, 10.0, Role::Active),
            ],
            Vec::new(),
            400.0,
        );

        let frame = engine.frame(0.0);
        assert_eq!(frame.nodes.len(), 3);
        // Moving node starts at its old point, entering at its target,
        // exiting stays put.
        assert_eq!((node(&frame, "stay").x, node(&frame, "stay").y), (0.0, 0.0));
        assert_eq!((node(&frame, "arrive").x, node(&frame, "arrive").y), (10.0, 10.0));
        assert_eq!(node(&frame, "arrive").opacity, 0.0);
        assert_eq!((node(&frame, "leave").x, node(&frame, "leave").y), (100.0, 0.0));
        assert_eq!(node(&frame, "leave").opacity, 1.0);
    }

    #[test]
    fn terminal_frame_reaches_exact_targets() {
        let mut engine = engine();
        engine.snap_to(&[
            pos("m", 0.0, 0.0, Role::Active),
            pos("gone", 5.0, 5.0, Role::Child),
        ]);
        engine.begin_transition(
            &[pos("m", 80.0, 40.0, Role::Parent), pos("new", 1.0, 2.0, Role::Active)],
            Vec::new(),
            400.0,
        );

        let frame = engine.frame(400.0);
        assert!(frame.done());
        assert_eq!((node(&frame, "m").x, node(&frame, "m").y), (80.0, 40.0));
        assert_eq!(node(&frame, "new").opacity, 1.0);
        assert_eq!(node(&frame, "new").scale, 1.0);
        assert_eq!(node(&frame, "gone").opacity, 0.0);
        assert!((node(&frame, "gone").scale - 0.9).abs() < 1e-6);

        // Snapshot holds only the new layout; the engine is idle again.
        assert_eq!(engine.state(), TransitionState::Idle);
        assert_eq!(engine.snapshot().len(), 2);
        assert!(engine.snapshot().contains_key("m"));
        assert!(!engine.snapshot().contains_key("gone"));
    }

    #[test]
    fn easing_is_cubic_ease_out() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);

        let mut engine = engine();
        engine.snap_to(&[pos("m", 0.0, 0.0, Role::Active)]);
        engine.begin_transition(&[pos("m", 100.0, 0.0, Role::Active)], Vec::new(), 400.0);
        let frame = engine.frame(200.0);
        assert!((node(&frame, "m").x - 87.5).abs() < 1e-3);
    }

    #[test]
    fn rects_use_cached_dimensions_with_fallback() {
        let mut engine = engine();
        engine.cache_dimensions("big", 200.0, 48.0);
        engine.snap_to(&[pos("big", 0.0, 0.0, Role::Active)]);
        engine.begin_transition(
            &[pos("big", 100.0, 100.0, Role::Active), pos("fresh", 40.0, 40.0, Role::Child)],
            Vec::new(),
            400.0,
        );
        let frame = engine.frame(400.0);

        let big = &frame.rects["big"];
        assert_eq!((big.width, big.height), (200.0, 48.0));
        assert_eq!((big.left, big.top), (0.0, 76.0));

        let fresh = &frame.rects["fresh"];
        assert_eq!((fresh.width, fresh.height), (120.0, 36.0));
    }

    #[test]
    fn cancellation_commits_nothing_and_captures_in_flight_points() {
        let mut engine = engine();
        engine.snap_to(&[pos("m", 0.0, 0.0, Role::Active)]);
        engine.begin_transition(&[pos("m", 100.0, 0.0, Role::Active)], Vec::new(), 400.0);
        engine.frame(200.0); // eased = 0.875, x = 87.5

        let before = engine.snapshot().clone();
        engine.begin_transition(&[pos("m", 0.0, 0.0, Role::Active)], Vec::new(), 400.0);
        // Old run never committed.
        assert_eq!(engine.snapshot(), &before);

        // The superseding transition starts from the interpolated point, not
        // from the settled snapshot.
        let frame = engine.frame(0.0);
        assert!((node(&frame, "m").x - 87.5).abs() < 1e-3);
    }

    #[test]
    fn cancel_midway_reclassifies_entering_as_moving() {
        let mut engine = engine();
        engine.snap_to(&[pos("root", 0.0, 0.0, Role::Active)]);
        engine.begin_transition(
            &[pos("root", 0.0, 0.0, Role::Parent), pos("a", 50.0, 50.0, Role::Active)],
            Vec::new(),
            400.0,
        );
        engine.frame(100.0); // "a" is mid fade-in

        engine.begin_transition(
            &[pos("root", 0.0, 0.0, Role::Parent), pos("a", 80.0, 80.0, Role::Active)],
            Vec::new(),
            400.0,
        );
        // Membership reclassification: "a" is now moving, so its alpha snaps
        // back to 1 rather than resuming the fade.
        let frame = engine.frame(0.0);
        assert_eq!(node(&frame, "a").opacity, 1.0);
        assert_eq!((node(&frame, "a").x, node(&frame, "a").y), (50.0, 50.0));
    }

    #[test]
    fn explicit_cancel_keeps_snapshot_settled() {
        let mut engine = engine();
        let rects = engine.snap_to(&[pos("m", 10.0, 20.0, Role::Active)]);
        assert_eq!(rects["m"].center(), (10.0, 20.0));

        engine.begin_transition(&[pos("m", 90.0, 90.0, Role::Active)], Vec::new(), 400.0);
        engine.frame(100.0);
        engine.cancel();

        assert_eq!(engine.state(), TransitionState::Idle);
        let point = engine.snapshot()["m"];
        assert_eq!((point.x, point.y), (10.0, 20.0));
        // Frames after cancel are inert.
        assert_eq!(engine.frame(999.0).state, TransitionState::Idle);
    }

    #[test]
    fn snap_to_bypasses_running_transition() {
        let mut engine = engine();
        engine.begin_transition(&[pos("m", 100.0, 0.0, Role::Active)], Vec::new(), 400.0);
        let rects = engine.snap_to(&[pos("m", 7.0, 7.0, Role::Active)]);
        assert_eq!(engine.state(), TransitionState::Idle);
        assert_eq!(rects["m"].center(), (7.0, 7.0));
        assert_eq!(engine.snapshot()["m"].x, 7.0);
    }

    #[test]
    fn frame_carries_target_edge_list() {
        let mut engine = engine();
        engine.begin_transition(
            &[pos("p", 0.0, 0.0, Role::Parent), pos("c", 0.0, 50.0, Role::Active)],
            vec![edge("p", "c", EdgeKind::Parent)],
            400.0,
        );
        let frame = engine.frame(100.0);
        assert_eq!(frame.edges.len(), 1);
        assert_eq!(frame.edges[0].kind, EdgeKind::Parent);
    }

    #[test]
    fn zero_duration_settles_on_first_frame() {
        let mut engine = engine();
        engine.begin_transition(&[pos("m", 5.0, 5.0, Role::Active)], Vec::new(), 0.0);
        let frame = engine.frame(0.0);
        assert!(frame.done());
        assert_eq!(engine.snapshot()["m"].x, 5.0);
    }

    #[test]
    fn alphas_map_tracks_node_opacity() {
        let mut engine = engine();
        engine.snap_to(&[pos("old", 0.0, 0.0, Role::Active)]);
        engine.begin_transition(&[pos("new", 1.0, 1.0, Role::Active)], Vec::new(), 400.0);
        let frame = engine.frame(200.0);
        let alphas = frame.alphas();
        assert!((alphas["new"] - 0.875).abs() < 1e-3);
        assert!((alphas["old"] - 0.125).abs() < 1e-3);
    }
}
