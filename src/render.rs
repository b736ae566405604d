use crate::animation::FrameUpdate;
use crate::canvas::{edge_path, EdgePath};
use crate::config::Config;
use crate::ir::{EdgeKind, EdgeStyle, Graph, Role};
use crate::layout::{Layout, Rect};
use crate::theme::{parse_color, Theme};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// A drawable snapshot: either a settled layout or one mid-transition frame.
#[derive(Debug, Clone)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<crate::layout::EdgeDef>,
    pub rects: BTreeMap<String, Rect>,
    /// Eased transition progress; 1.0 for settled scenes.
    pub progress: f32,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub role: Role,
    pub rect: Rect,
    pub opacity: f32,
    pub scale: f32,
}

impl Scene {
    pub fn from_layout(
        layout: &Layout,
        graph: &Graph,
        rects: &BTreeMap<String, Rect>,
        width: f32,
        height: f32,
    ) -> Self {
        let nodes = layout
            .positions
            .iter()
            .filter_map(|pos| {
                let rect = rects.get(&pos.id)?.clone();
                Some(SceneNode {
                    id: pos.id.clone(),
                    label: label_of(graph, &pos.id),
                    role: pos.role,
                    rect,
                    opacity: 1.0,
                    scale: 1.0,
                })
            })
            .collect();
        Self {
            width,
            height,
            nodes,
            edges: layout.edges.clone(),
            rects: rects.clone(),
            progress: 1.0,
        }
    }

    pub fn from_frame(frame: &FrameUpdate, graph: &Graph, width: f32, height: f32) -> Self {
        let nodes = frame
            .nodes
            .iter()
            .filter_map(|node| {
                let rect = frame.rects.get(&node.id)?.clone();
                Some(SceneNode {
                    id: node.id.clone(),
                    label: label_of(graph, &node.id),
                    role: node.role,
                    rect,
                    opacity: node.opacity,
                    scale: node.scale,
                })
            })
            .collect();
        Self {
            width,
            height,
            nodes,
            edges: frame.edges.clone(),
            rects: frame.rects.clone(),
            progress: frame.progress,
        }
    }

    fn opacity_of(&self, id: &str) -> f32 {
        self.nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.opacity)
            .unwrap_or(1.0)
    }
}

fn label_of(graph: &Graph, id: &str) -> String {
    graph
        .get(id)
        .map(|node| node.label.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Render a scene to a standalone SVG document.
pub fn render_svg(scene: &Scene, theme: &Theme, config: &Config, style: EdgeStyle) -> String {
    let width = scene.width.max(1.0);
    let height = scene.height.max(1.0);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));

    let background = if theme.background.eq_ignore_ascii_case("transparent") {
        config.render.background.as_str()
    } else {
        theme.background.as_str()
    };
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(background)
    ));

    for edge in &scene.edges {
        let Some(path) = edge_path(edge, &scene.rects, style) else {
            continue;
        };
        let alpha = scene
            .opacity_of(&edge.source_id)
            .min(scene.opacity_of(&edge.target_id));
        if alpha < config.motion.min_edge_alpha {
            continue;
        }
        let color = match edge.kind {
            EdgeKind::Parent => &theme.edge_parent_color,
            EdgeKind::Child => &theme.edge_color,
        };
        let (stroke, stroke_opacity) = split_color(color, alpha);
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-opacity=\"{stroke_opacity:.4}\" stroke-width=\"{}\" stroke-linecap=\"round\"/>",
            path_data(&path),
            theme.edge_width
        ));
    }

    for node in &scene.nodes {
        svg.push_str(&node_pill_svg(node, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn path_data(path: &EdgePath) -> String {
    if path.is_curve {
        format!(
            "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
            path.sx, path.sy, path.cp1.0, path.cp1.1, path.cp2.0, path.cp2.1, path.tx, path.ty
        )
    } else {
        format!("M {:.2} {:.2} L {:.2} {:.2}", path.sx, path.sy, path.tx, path.ty)
    }
}

fn node_pill_svg(node: &SceneNode, theme: &Theme) -> String {
    let (bg, border, text) = match node.role {
        Role::Active => (
            &theme.node_active_bg,
            &theme.node_active_border,
            &theme.node_active_text,
        ),
        Role::Parent | Role::Child => (
            &theme.node_passive_bg,
            &theme.node_passive_border,
            &theme.node_passive_text,
        ),
    };

    let rect = &node.rect;
    let (cx, cy) = rect.center();
    let radius = rect.height / 2.0;
    let (bg_color, bg_opacity) = split_color(bg, node.opacity);
    let (border_color, border_opacity) = split_color(border, node.opacity);
    let (text_color, text_opacity) = split_color(text, node.opacity);

    let transform = if (node.scale - 1.0).abs() > 1e-4 {
        format!(
            " transform=\"translate({cx:.2} {cy:.2}) scale({:.4}) translate({:.2} {:.2})\"",
            node.scale, -cx, -cy
        )
    } else {
        String::new()
    };

    let mut out = format!("<g{transform}>");
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{radius:.2}\" ry=\"{radius:.2}\" fill=\"{bg_color}\" fill-opacity=\"{bg_opacity:.4}\" stroke=\"{border_color}\" stroke-opacity=\"{border_opacity:.4}\" stroke-width=\"1\"/>",
        rect.left, rect.top, rect.width, rect.height
    ));
    out.push_str(&format!(
        "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{text_color}\" fill-opacity=\"{text_opacity:.4}\">{}</text>",
        cy + theme.font_size * 0.35,
        escape_xml(&theme.font_family),
        theme.font_size,
        escape_xml(&node.label)
    ));
    out.push_str("</g>");
    out
}

/// Split a CSS color into an opaque color plus an opacity attribute,
/// folding `extra_alpha` in. Unparseable colors pass through untouched.
fn split_color(value: &str, extra_alpha: f32) -> (String, f32) {
    match parse_color(value) {
        Some(rgba) => (rgba.hex(), (rgba.a * extra_alpha).clamp(0.0, 1.0)),
        None => (value.to_string(), extra_alpha.clamp(0.0, 1.0)),
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{svg}");
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(config.render.width, config.render.height)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::Node;
    use crate::layout::compute_layout;
    use crate::measure::{EstimatedRectProvider, RectProvider};

    fn scene() -> (Scene, Theme, Config) {
        let graph = Graph::new(vec![
            Node::with_children("root", "Root", &["a", "b"]),
            Node::new("a", "Alpha"),
            Node::new("b", "Beta"),
        ]);
        let theme = Theme::dark();
        let config = Config::default();
        let layout = compute_layout(&graph, "root", 800.0, 600.0, &LayoutConfig::default());
        let provider = EstimatedRectProvider::new(
            &layout.positions,
            graph
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.label.clone())),
            &theme,
        );
        let rects = layout
            .positions
            .iter()
            .filter_map(|p| provider.node_rect(&p.id).map(|r| (p.id.clone(), r)))
            .collect();
        (
            Scene::from_layout(&layout, &graph, &rects, 800.0, 600.0),
            theme,
            config,
        )
    }

    #[test]
    fn svg_snapshot_contains_pills_and_edges() {
        let (scene, theme, config) = scene();
        let svg = render_svg(&scene, &theme, &config, EdgeStyle::Waterfall);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains("Root"));
        assert!(svg.contains("Alpha"));
        // Two child edges, curved.
        assert_eq!(svg.matches(" C ").count(), 2);
    }

    #[test]
    fn theme_alpha_becomes_stroke_opacity() {
        let (scene, theme, config) = scene();
        let svg = render_svg(&scene, &theme, &config, EdgeStyle::Straight);
        // edge_color rgba(6, 182, 212, 0.25) splits into hex + opacity.
        assert!(svg.contains("stroke=\"#06b6d4\""));
        assert!(svg.contains("stroke-opacity=\"0.2500\""));
        assert!(svg.contains(" L "));
    }

    #[test]
    fn transparent_background_falls_back_to_render_config() {
        let (scene, theme, config) = scene();
        let svg = render_svg(&scene, &theme, &config, EdgeStyle::Waterfall);
        assert!(svg.contains(&format!("fill=\"{}\"", config.render.background)));
    }

    #[test]
    fn labels_are_escaped() {
        let (mut scene, theme, config) = scene();
        scene.nodes[0].label = "a < b & c".to_string();
        let svg = render_svg(&scene, &theme, &config, EdgeStyle::Waterfall);
        assert!(svg.contains("a &lt; b &amp; c"));
    }
}
