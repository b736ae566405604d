use crate::animation::AnimationEngine;
use crate::config::{load_config, Config};
use crate::ir::{EdgeStyle, Graph};
use crate::layout::{compute_layout, Layout};
use crate::measure::{EstimatedRectProvider, RectProvider};
use crate::render::{render_svg, write_output_svg, Scene};
use crate::theme::Theme;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "plexr", version, about = "Plex tree-walk snapshot renderer")]
pub struct Args {
    /// Input node graph (JSON array) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Active node id
    #[arg(short = 'a', long = "active")]
    pub active: String,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Theme preset (ignored when the config file sets a full theme)
    #[arg(short = 't', long = "theme", value_enum, default_value = "dark")]
    pub theme: ThemeArg,

    /// Edge path shape: waterfall, scurve or straight
    #[arg(short = 's', long = "edgeStyle", default_value = "waterfall")]
    pub edge_style: String,

    /// Config JSON5 file overriding theme/layout/motion defaults
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Container width
    #[arg(short = 'w', long = "width", default_value_t = 800.0)]
    pub width: f32,

    /// Container height
    #[arg(short = 'H', long = "height", default_value_t = 600.0)]
    pub height: f32,

    /// Render a transition from this node id toward --active
    #[arg(long = "from")]
    pub from: Option<String>,

    /// Number of evenly spaced transition frames to emit (with --from)
    #[arg(long = "frames", default_value_t = 1)]
    pub frames: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ThemeArg {
    Dark,
    Light,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if args.config.is_none() {
        config.theme = match args.theme {
            ThemeArg::Dark => Theme::dark(),
            ThemeArg::Light => Theme::light(),
        };
    }
    config.render.width = args.width;
    config.render.height = args.height;

    let edge_style = EdgeStyle::from_token(&args.edge_style)
        .ok_or_else(|| anyhow::anyhow!("unknown edge style: {}", args.edge_style))?;

    let input = read_input(args.input.as_deref())?;
    let graph = Graph::from_nodes(serde_json::from_str(&input)?)?;
    if !graph.contains(&args.active) {
        return Err(anyhow::anyhow!("unknown active id: {}", args.active));
    }

    let scenes = match &args.from {
        Some(from) if args.frames > 1 => {
            transition_scenes(&graph, from, &args.active, &config, args.frames)?
        }
        _ => vec![settled_scene(&graph, &args.active, &config)],
    };

    if scenes.len() == 1 {
        let svg = render_svg(&scenes[0], &config.theme, &config, edge_style);
        return write_scene(&svg, args.output.as_deref(), args.output_format, &config);
    }

    let outputs = numbered_outputs(args.output.as_deref(), args.output_format, scenes.len())?;
    for (scene, output) in scenes.iter().zip(&outputs) {
        let svg = render_svg(scene, &config.theme, &config, edge_style);
        write_scene(&svg, Some(output), args.output_format, &config)?;
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn layout_rects(
    graph: &Graph,
    layout: &Layout,
    config: &Config,
) -> BTreeMap<String, crate::layout::Rect> {
    let provider = EstimatedRectProvider::new(
        &layout.positions,
        graph
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.label.clone())),
        &config.theme,
    );
    layout
        .positions
        .iter()
        .filter_map(|pos| provider.node_rect(&pos.id).map(|r| (pos.id.clone(), r)))
        .collect()
}

fn settled_scene(graph: &Graph, active: &str, config: &Config) -> Scene {
    let layout = compute_layout(
        graph,
        active,
        config.render.width,
        config.render.height,
        &config.layout,
    );
    let rects = layout_rects(graph, &layout, config);
    Scene::from_layout(&layout, graph, &rects, config.render.width, config.render.height)
}

/// Pump a real transition through the engine, sampling `frames` evenly
/// spaced points from start to settle.
fn transition_scenes(
    graph: &Graph,
    from: &str,
    active: &str,
    config: &Config,
    frames: usize,
) -> Result<Vec<Scene>> {
    if !graph.contains(from) {
        return Err(anyhow::anyhow!("unknown --from id: {from}"));
    }

    let (width, height) = (config.render.width, config.render.height);
    let from_layout = compute_layout(graph, from, width, height, &config.layout);
    let to_layout = compute_layout(graph, active, width, height, &config.layout);

    let mut engine = AnimationEngine::new(config.motion.clone());
    for rects in [
        layout_rects(graph, &from_layout, config),
        layout_rects(graph, &to_layout, config),
    ] {
        for rect in rects.values() {
            engine.cache_dimensions(&rect.id, rect.width, rect.height);
        }
    }

    engine.snap_to(&from_layout.positions);
    let duration = config.theme.transition_duration;
    engine.begin_transition(&to_layout.positions, to_layout.edges.clone(), duration);

    let mut scenes = Vec::with_capacity(frames);
    for i in 0..frames {
        let elapsed = duration as f64 * i as f64 / (frames - 1) as f64;
        let frame = engine.frame(elapsed);
        scenes.push(Scene::from_frame(&frame, graph, width, height));
    }
    Ok(scenes)
}

fn write_scene(
    svg: &str,
    output: Option<&Path>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    match format {
        OutputFormat::Svg => write_output_svg(svg, output),
        OutputFormat::Png => {
            let output =
                output.ok_or_else(|| anyhow::anyhow!("output path required for PNG output"))?;
            write_png(svg, output, config)
        }
    }
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, config)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires the 'png' feature"
    ))
}

fn numbered_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let base = output.ok_or_else(|| anyhow::anyhow!("output path required for frame sequences"))?;
    let ext = match format {
        OutputFormat::Svg => "svg",
        OutputFormat::Png => "png",
    };
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    let dir = base.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok((0..count)
        .map(|i| dir.join(format!("{stem}-{i:02}.{ext}")))
        .collect())
}
