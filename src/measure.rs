use crate::layout::{NodePosition, Rect};
use crate::theme::Theme;
use crate::text_metrics;
use std::collections::BTreeMap;

// Pill chrome around the label; mirrors the default node renderer's padding.
const PILL_PAD_X: f32 = 16.0;
const PILL_PAD_Y: f32 = 10.0;
const PILL_LINE_HEIGHT: f32 = 1.2;

/// Capability for locating a rendered node's bounding box, container-local.
///
/// A DOM-style backend finds the element tagged `data-plex-node=<id>` and
/// subtracts the container origin. Headless backends return whatever boxes
/// they know; ids without a rendered element yield `None`.
pub trait RectProvider {
    fn node_rect(&self, id: &str) -> Option<Rect>;
}

/// Sample the provider for each id. Missing ids are omitted, not errors —
/// partial maps are expected mid-mount and mid-transition.
pub fn measure_nodes(provider: &dyn RectProvider, ids: &[String]) -> BTreeMap<String, Rect> {
    let mut rects = BTreeMap::new();
    for id in ids {
        if let Some(rect) = provider.node_rect(id) {
            rects.insert(id.clone(), rect);
        }
    }
    rects
}

/// Map-backed provider for tests and snapshot pipelines.
#[derive(Debug, Default, Clone)]
pub struct FixedRectProvider {
    rects: BTreeMap<String, Rect>,
}

impl FixedRectProvider {
    pub fn new(rects: BTreeMap<String, Rect>) -> Self {
        Self { rects }
    }

    pub fn insert(&mut self, rect: Rect) {
        self.rects.insert(rect.id.clone(), rect);
    }
}

impl RectProvider for FixedRectProvider {
    fn node_rect(&self, id: &str) -> Option<Rect> {
        self.rects.get(id).cloned()
    }
}

/// Headless provider that sizes a pill from its label text and centers the
/// box on the node's laid-out position. Used by the CLI exporter and anywhere
/// no real render pass exists to measure.
pub struct EstimatedRectProvider {
    positions: BTreeMap<String, (f32, f32)>,
    labels: BTreeMap<String, String>,
    font_family: String,
    font_size: f32,
}

impl EstimatedRectProvider {
    pub fn new(
        positions: &[NodePosition],
        labels: impl IntoIterator<Item = (String, String)>,
        theme: &Theme,
    ) -> Self {
        Self {
            positions: positions
                .iter()
                .map(|pos| (pos.id.clone(), (pos.x, pos.y)))
                .collect(),
            labels: labels.into_iter().collect(),
            font_family: theme.font_family.clone(),
            font_size: theme.font_size,
        }
    }

    pub fn pill_size(&self, label: &str) -> (f32, f32) {
        let text_width = text_metrics::estimate_text_width(label, self.font_size, &self.font_family);
        (
            text_width + PILL_PAD_X * 2.0,
            self.font_size * PILL_LINE_HEIGHT + PILL_PAD_Y * 2.0,
        )
    }
}

impl RectProvider for EstimatedRectProvider {
    fn node_rect(&self, id: &str) -> Option<Rect> {
        let &(x, y) = self.positions.get(id)?;
        let label = self.labels.get(id).map(String::as_str).unwrap_or(id);
        let (width, height) = self.pill_size(label);
        Some(Rect::from_center(id, x, y, width, height))
    }
}
