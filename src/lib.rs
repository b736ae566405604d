pub mod animation;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod ir;
pub mod layout;
pub mod measure;
pub mod render;
pub mod scheduler;
pub mod text_metrics;
pub mod theme;

pub use animation::{AnimatedNode, AnimationEngine, FrameUpdate, TransitionState};
pub use canvas::{draw_edges, draw_edges_animated, RecordingSurface, Surface};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{load_config, Config, LayoutConfig, MotionConfig, RenderConfig};
pub use controller::PlexController;
pub use ir::{EdgeKind, EdgeStyle, Graph, GraphError, Node, Role};
pub use layout::{compute_layout, EdgeDef, Layout, NodePosition, Rect};
pub use measure::{measure_nodes, EstimatedRectProvider, FixedRectProvider, RectProvider};
pub use render::{render_svg, Scene, SceneNode};
pub use scheduler::{FrameHandle, FrameScheduler, ManualScheduler};
pub use theme::Theme;
