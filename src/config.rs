use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of the plex layout, as fractions of the container plus the
/// per-child horizontal slot. Defaults reproduce the reference layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub active_y_fraction: f32,
    pub parent_y_fraction: f32,
    pub child_y_fraction: f32,
    pub max_spread_fraction: f32,
    pub child_slot_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            active_y_fraction: 0.42,
            parent_y_fraction: 0.15,
            child_y_fraction: 0.72,
            max_spread_fraction: 0.85,
            child_slot_width: 160.0,
        }
    }
}

/// Animation and measurement timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionConfig {
    /// Box used for edge anchoring before a node has ever been measured.
    pub fallback_node_width: f32,
    pub fallback_node_height: f32,
    /// Delay before sampling rendered boxes after a layout change.
    pub measure_delay_ms: f64,
    /// Subdivision count for bezier arc-length approximation.
    pub curve_segments: u32,
    /// Edges below this alpha are skipped to avoid overdraw.
    pub min_edge_alpha: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            fallback_node_width: 120.0,
            fallback_node_height: 36.0,
            measure_delay_ms: 50.0,
            curve_segments: 20,
            min_edge_alpha: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    /// Fill behind exported snapshots; themes often use `transparent` on
    /// screen, which PNG export replaces with this.
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            background: "#0f172a".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_overrides: Option<ThemeFile>,
    layout: Option<LayoutConfig>,
    motion: Option<MotionConfig>,
    render: Option<RenderConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeFile {
    background: Option<String>,
    edge_color: Option<String>,
    edge_parent_color: Option<String>,
    edge_width: Option<f32>,
    node_active_bg: Option<String>,
    node_active_text: Option<String>,
    node_active_border: Option<String>,
    node_passive_bg: Option<String>,
    node_passive_text: Option<String>,
    node_passive_border: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    transition_duration: Option<f32>,
}

/// Load a config file (JSON5-lenient), applying it over the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = json5::from_str(&contents)?;

    if let Some(name) = parsed.theme.as_deref() {
        config.theme = Theme::preset(name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme preset: {name}"))?;
    }
    if let Some(vars) = parsed.theme_overrides {
        apply_theme_overrides(&mut config.theme, vars);
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(motion) = parsed.motion {
        config.motion = motion;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    Ok(config)
}

fn apply_theme_overrides(theme: &mut Theme, vars: ThemeFile) {
    if let Some(v) = vars.background {
        theme.background = v;
    }
    if let Some(v) = vars.edge_color {
        theme.edge_color = v;
    }
    if let Some(v) = vars.edge_parent_color {
        theme.edge_parent_color = v;
    }
    if let Some(v) = vars.edge_width {
        theme.edge_width = v;
    }
    if let Some(v) = vars.node_active_bg {
        theme.node_active_bg = v;
    }
    if let Some(v) = vars.node_active_text {
        theme.node_active_text = v;
    }
    if let Some(v) = vars.node_active_border {
        theme.node_active_border = v;
    }
    if let Some(v) = vars.node_passive_bg {
        theme.node_passive_bg = v;
    }
    if let Some(v) = vars.node_passive_text {
        theme.node_passive_text = v;
    }
    if let Some(v) = vars.node_passive_border {
        theme.node_passive_border = v;
    }
    if let Some(v) = vars.font_family {
        theme.font_family = v;
    }
    if let Some(v) = vars.font_size {
        theme.font_size = v;
    }
    if let Some(v) = vars.transition_duration {
        theme.transition_duration = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_geometry() {
        let config = Config::default();
        assert_eq!(config.layout.active_y_fraction, 0.42);
        assert_eq!(config.layout.child_slot_width, 160.0);
        assert_eq!(config.motion.fallback_node_width, 120.0);
        assert_eq!(config.motion.curve_segments, 20);
    }

    #[test]
    fn config_file_overrides_apply_over_preset() {
        let dir = std::env::temp_dir().join("plexr-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json5");
        std::fs::write(
            &path,
            r#"{
                theme: "light",
                themeOverrides: { transitionDuration: 250, edgeWidth: 2.5 },
                motion: {
                    fallbackNodeWidth: 100,
                    fallbackNodeHeight: 30,
                    measureDelayMs: 40,
                    curveSegments: 16,
                    minEdgeAlpha: 0.02,
                },
            }"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.theme.node_active_text, Theme::light().node_active_text);
        assert_eq!(config.theme.transition_duration, 250.0);
        assert_eq!(config.theme.edge_width, 2.5);
        assert_eq!(config.motion.curve_segments, 16);
        // Untouched section keeps defaults.
        assert_eq!(config.layout.parent_y_fraction, 0.15);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let dir = std::env::temp_dir().join("plexr-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json5");
        std::fs::write(&path, r#"{ theme: "solarized" }"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
