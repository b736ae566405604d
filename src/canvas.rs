use crate::config::MotionConfig;
use crate::ir::{EdgeKind, EdgeStyle};
use crate::layout::{EdgeDef, Rect};
use crate::theme::Theme;
use std::collections::BTreeMap;

// Waterfall control points: drop steeply from the source, ease into the target.
const WATERFALL_DROP: f32 = 0.7;
const WATERFALL_APPROACH: f32 = 0.3;

/// Immediate-mode 2D drawing surface, the subset of a canvas context the edge
/// renderer needs. Logical-pixel coordinates; `set_device_scale` is applied
/// once per redraw to correct for high-density displays.
pub trait Surface {
    /// Logical size. Zero-area surfaces make every draw call a no-op.
    fn size(&self) -> (f32, f32);
    fn clear(&mut self);
    fn set_device_scale(&mut self, scale: f32);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn bezier_curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32);
    fn set_stroke_color(&mut self, color: &str);
    fn set_line_width(&mut self, width: f32);
    fn set_round_cap(&mut self);
    fn set_line_dash(&mut self, dash: f32, gap: f32);
    fn clear_line_dash(&mut self);
    fn set_global_alpha(&mut self, alpha: f32);
    fn stroke(&mut self);
}

/// Resolved geometry for one edge: anchors plus cubic control points.
/// `is_curve` is false only for the straight style, where the control points
/// degenerate to the endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePath {
    pub sx: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
    pub cp1: (f32, f32),
    pub cp2: (f32, f32),
    pub is_curve: bool,
}

/// Anchor an edge bottom-center of its source to top-center of its target.
/// `None` when either endpoint has no measured rect yet — expected during
/// mount and mid-transition, the edge is simply skipped this draw.
pub fn edge_path(
    edge: &EdgeDef,
    rects: &BTreeMap<String, Rect>,
    style: EdgeStyle,
) -> Option<EdgePath> {
    let source = rects.get(&edge.source_id)?;
    let target = rects.get(&edge.target_id)?;

    let (sx, sy) = source.bottom_center();
    let (tx, ty) = target.top_center();

    let path = match style {
        EdgeStyle::Straight => EdgePath {
            sx,
            sy,
            tx,
            ty,
            cp1: (sx, sy),
            cp2: (tx, ty),
            is_curve: false,
        },
        EdgeStyle::SCurve => {
            let mid_y = (sy + ty) / 2.0;
            EdgePath {
                sx,
                sy,
                tx,
                ty,
                cp1: (sx, mid_y),
                cp2: (tx, mid_y),
                is_curve: true,
            }
        }
        EdgeStyle::Waterfall => {
            let dy = ty - sy;
            EdgePath {
                sx,
                sy,
                tx,
                ty,
                cp1: (sx, sy + dy * WATERFALL_DROP),
                cp2: (tx, ty - dy * WATERFALL_APPROACH),
                is_curve: true,
            }
        }
    };
    Some(path)
}

/// Point on the cubic at parameter `t`.
pub fn cubic_point(path: &EdgePath, t: f32) -> (f32, f32) {
    let mt = 1.0 - t;
    let x = mt * mt * mt * path.sx
        + 3.0 * mt * mt * t * path.cp1.0
        + 3.0 * mt * t * t * path.cp2.0
        + t * t * t * path.tx;
    let y = mt * mt * mt * path.sy
        + 3.0 * mt * mt * t * path.cp1.1
        + 3.0 * mt * t * t * path.cp2.1
        + t * t * t * path.ty;
    (x, y)
}

/// Arc length by fixed-subdivision sampling. Good enough for dash-based
/// reveal; exactness is not worth the iteration count at 60Hz.
pub fn approximate_path_length(path: &EdgePath, segments: u32) -> f32 {
    let segments = segments.max(1);
    let mut length = 0.0f32;
    let (mut prev_x, mut prev_y) = (path.sx, path.sy);
    for i in 1..=segments {
        let t = i as f32 / segments as f32;
        let (x, y) = cubic_point(path, t);
        length += (x - prev_x).hypot(y - prev_y);
        (prev_x, prev_y) = (x, y);
    }
    length
}

fn stroke_color<'a>(edge: &EdgeDef, theme: &'a Theme) -> &'a str {
    match edge.kind {
        EdgeKind::Parent => &theme.edge_parent_color,
        EdgeKind::Child => &theme.edge_color,
    }
}

fn trace(surface: &mut dyn Surface, path: &EdgePath) {
    surface.move_to(path.sx, path.sy);
    if path.is_curve {
        surface.bezier_curve_to(
            path.cp1.0, path.cp1.1, path.cp2.0, path.cp2.1, path.tx, path.ty,
        );
    } else {
        surface.line_to(path.tx, path.ty);
    }
}

/// Full static redraw of the edge layer.
pub fn draw_edges(
    surface: &mut dyn Surface,
    edges: &[EdgeDef],
    rects: &BTreeMap<String, Rect>,
    theme: &Theme,
    style: EdgeStyle,
    scale: f32,
) {
    let (width, height) = surface.size();
    if width <= 0.0 || height <= 0.0 {
        return;
    }

    surface.clear();
    surface.set_device_scale(scale);

    for edge in edges {
        let Some(path) = edge_path(edge, rects, style) else {
            continue;
        };
        surface.begin_path();
        surface.set_stroke_color(stroke_color(edge, theme));
        surface.set_line_width(theme.edge_width);
        surface.set_round_cap();
        trace(surface, &path);
        surface.stroke();
    }
}

/// Animated redraw for one transition frame.
///
/// Edges whose endpoints are both fully opaque get the drawing-in reveal:
/// only the `progress` fraction of the arc length is stroked, via a dash
/// pattern. Edges touching fading nodes draw whole at the smaller endpoint
/// alpha instead; below `min_edge_alpha` they are skipped entirely.
pub fn draw_edges_animated(
    surface: &mut dyn Surface,
    edges: &[EdgeDef],
    rects: &BTreeMap<String, Rect>,
    theme: &Theme,
    style: EdgeStyle,
    scale: f32,
    progress: f32,
    alphas: &BTreeMap<String, f32>,
    motion: &MotionConfig,
) {
    let (width, height) = surface.size();
    if width <= 0.0 || height <= 0.0 {
        return;
    }

    surface.clear();
    surface.set_device_scale(scale);

    for edge in edges {
        let Some(path) = edge_path(edge, rects, style) else {
            continue;
        };

        let alpha_of = |id: &str| alphas.get(id).copied().unwrap_or(1.0);
        let alpha = alpha_of(&edge.source_id).min(alpha_of(&edge.target_id));
        if alpha < motion.min_edge_alpha {
            continue;
        }

        surface.begin_path();
        surface.set_stroke_color(stroke_color(edge, theme));
        surface.set_line_width(theme.edge_width);
        surface.set_round_cap();

        if alpha >= 1.0 {
            surface.set_global_alpha(1.0);
            if path.is_curve {
                let total = approximate_path_length(&path, motion.curve_segments);
                let visible = total * progress;
                surface.set_line_dash(visible, (total - visible).max(0.0));
                trace(surface, &path);
                surface.stroke();
                surface.clear_line_dash();
            } else {
                // Straight lines reveal by sliding the endpoint.
                let ex = path.sx + (path.tx - path.sx) * progress;
                let ey = path.sy + (path.ty - path.sy) * progress;
                surface.move_to(path.sx, path.sy);
                surface.line_to(ex, ey);
                surface.stroke();
            }
        } else {
            surface.set_global_alpha(alpha);
            trace(surface, &path);
            surface.stroke();
            surface.set_global_alpha(1.0);
        }
    }
}

/// Surface that records draw calls instead of painting. Backs the headless
/// test harness and doubles as a trace for snapshotting draw sequences.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    DeviceScale(f32),
    BeginPath,
    MoveTo(f32, f32),
    LineTo(f32, f32),
    BezierCurveTo(f32, f32, f32, f32, f32, f32),
    StrokeColor(String),
    LineWidth(f32),
    RoundCap,
    LineDash(f32, f32),
    ClearLineDash,
    GlobalAlpha(f32),
    Stroke,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.ops.iter().filter(|op| **op == DrawOp::Stroke).count()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }
    fn set_device_scale(&mut self, scale: f32) {
        self.ops.push(DrawOp::DeviceScale(scale));
    }
    fn begin_path(&mut self) {
        self.ops.push(DrawOp::BeginPath);
    }
    fn move_to(&mut self, x: f32, y: f32) {
        self.ops.push(DrawOp::MoveTo(x, y));
    }
    fn line_to(&mut self, x: f32, y: f32) {
        self.ops.push(DrawOp::LineTo(x, y));
    }
    fn bezier_curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.ops.push(DrawOp::BezierCurveTo(c1x, c1y, c2x, c2y, x, y));
    }
    fn set_stroke_color(&mut self, color: &str) {
        self.ops.push(DrawOp::StrokeColor(color.to_string()));
    }
    fn set_line_width(&mut self, width: f32) {
        self.ops.push(DrawOp::LineWidth(width));
    }
    fn set_round_cap(&mut self) {
        self.ops.push(DrawOp::RoundCap);
    }
    fn set_line_dash(&mut self, dash: f32, gap: f32) {
        self.ops.push(DrawOp::LineDash(dash, gap));
    }
    fn clear_line_dash(&mut self) {
        self.ops.push(DrawOp::ClearLineDash);
    }
    fn set_global_alpha(&mut self, alpha: f32) {
        self.ops.push(DrawOp::GlobalAlpha(alpha));
    }
    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }
}
