use crate::config::LayoutConfig;
use crate::ir::{EdgeKind, Graph, Role};
use serde::{Deserialize, Serialize};

/// Center point assigned to a node for one layout pass. Never mutated, only
/// superseded by the next pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub role: Role,
}

/// Connective edge, derived from positions on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDef {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

/// Container-local bounding box, the authoritative anchor geometry for edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub id: String,
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Box centered on `(cx, cy)` with the given dimensions. Rendered nodes
    /// translate by (-50%, -50%), so this mirrors their on-screen box.
    pub fn from_center(id: &str, cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            top: cy - height / 2.0,
            left: cx - width / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Edge source anchor.
    pub fn bottom_center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height)
    }

    /// Edge target anchor.
    pub fn top_center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    pub positions: Vec<NodePosition>,
    pub edges: Vec<EdgeDef>,
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<&NodePosition> {
        self.positions.iter().find(|pos| pos.id == id)
    }
}

/// Position the active node, its parent and its children inside a
/// `width` x `height` container.
///
/// Pure and deterministic. An unknown `active_id` yields an empty layout;
/// child ids that do not resolve are dropped. Degenerate dimensions still run
/// the arithmetic — suppressing rendering for an unsized container is the
/// orchestrator's job.
pub fn compute_layout(
    graph: &Graph,
    active_id: &str,
    width: f32,
    height: f32,
    config: &LayoutConfig,
) -> Layout {
    let mut layout = Layout::default();

    let Some(active) = graph.get(active_id) else {
        return layout;
    };

    let center_x = width / 2.0;

    layout.positions.push(NodePosition {
        id: active.id.clone(),
        x: center_x,
        y: height * config.active_y_fraction,
        role: Role::Active,
    });

    if let Some(parent) = graph.parent_of(active_id) {
        layout.positions.push(NodePosition {
            id: parent.id.clone(),
            x: center_x,
            y: height * config.parent_y_fraction,
            role: Role::Parent,
        });
        layout.edges.push(EdgeDef {
            source_id: parent.id.clone(),
            target_id: active.id.clone(),
            kind: EdgeKind::Parent,
        });
    }

    let children: Vec<&crate::ir::Node> = active
        .children
        .iter()
        .filter_map(|id| graph.get(id))
        .collect();

    if !children.is_empty() {
        let child_y = height * config.child_y_fraction;
        let max_spread = width * config.max_spread_fraction;
        let total_spread = max_spread.min(children.len() as f32 * config.child_slot_width);
        let start_x = center_x - total_spread / 2.0;
        let gap = if children.len() == 1 {
            0.0
        } else {
            total_spread / (children.len() as f32 - 1.0)
        };

        for (i, child) in children.iter().enumerate() {
            let child_x = if children.len() == 1 {
                center_x
            } else {
                start_x + gap * i as f32
            };
            layout.positions.push(NodePosition {
                id: child.id.clone(),
                x: child_x,
                y: child_y,
                role: Role::Child,
            });
            layout.edges.push(EdgeDef {
                source_id: active.id.clone(),
                target_id: child.id.clone(),
                kind: EdgeKind::Child,
            });
        }
    }

    layout
}
