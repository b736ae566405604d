use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Visual style record for the plex canvas. Durations are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub background: String,
    pub edge_color: String,
    pub edge_parent_color: String,
    pub edge_width: f32,
    pub node_active_bg: String,
    pub node_active_text: String,
    pub node_active_border: String,
    pub node_passive_bg: String,
    pub node_passive_text: String,
    pub node_passive_border: String,
    pub font_family: String,
    pub font_size: f32,
    pub transition_duration: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: "transparent".to_string(),
            edge_color: "rgba(6, 182, 212, 0.25)".to_string(),
            edge_parent_color: "rgba(148, 163, 184, 0.2)".to_string(),
            edge_width: 1.5,
            node_active_bg: "rgba(6, 182, 212, 0.15)".to_string(),
            node_active_text: "#e2e8f0".to_string(),
            node_active_border: "rgba(6, 182, 212, 0.5)".to_string(),
            node_passive_bg: "rgba(30, 41, 59, 0.6)".to_string(),
            node_passive_text: "#94a3b8".to_string(),
            node_passive_border: "rgba(71, 85, 105, 0.4)".to_string(),
            font_family: "'Inter', system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            transition_duration: 400.0,
        }
    }

    pub fn light() -> Self {
        Self {
            background: "transparent".to_string(),
            edge_color: "rgba(6, 182, 212, 0.35)".to_string(),
            edge_parent_color: "rgba(100, 116, 139, 0.25)".to_string(),
            edge_width: 1.5,
            node_active_bg: "rgba(6, 182, 212, 0.1)".to_string(),
            node_active_text: "#1e293b".to_string(),
            node_active_border: "rgba(6, 182, 212, 0.6)".to_string(),
            node_passive_bg: "rgba(241, 245, 249, 0.8)".to_string(),
            node_passive_text: "#475569".to_string(),
            node_passive_border: "rgba(203, 213, 225, 0.6)".to_string(),
            font_family: "'Inter', system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            transition_duration: 400.0,
        }
    }

    /// Resolve a named preset; anything else falls through to `None` so the
    /// caller can supply a full custom record instead.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Parsed color, channels 0-255, alpha 0-1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {:.4})", self.r, self.g, self.b, self.a)
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self {
            a: (self.a * alpha).clamp(0.0, 1.0),
            ..*self
        }
    }
}

static RGB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*([0-9.]+)\s*)?\)$").unwrap()
});
static HSL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^hsla?\(\s*([0-9.]+)\s*,\s*([0-9.]+)%\s*,\s*([0-9.]+)%\s*(?:,\s*([0-9.]+)\s*)?\)$")
        .unwrap()
});

/// Parse `#hex` / `rgb()` / `rgba()` / `hsl()` / `hsla()` / `transparent`.
/// Unknown strings yield `None`; callers fall back to the raw value.
pub fn parse_color(value: &str) -> Option<Rgba> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Some(Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0.0,
        });
    }
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(caps) = RGB_RE.captures(value) {
        let r: u8 = caps[1].parse().ok()?;
        let g: u8 = caps[2].parse().ok()?;
        let b: u8 = caps[3].parse().ok()?;
        let a: f32 = caps
            .get(4)
            .map(|m| m.as_str().parse().unwrap_or(1.0))
            .unwrap_or(1.0);
        return Some(Rgba {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
        });
    }
    if let Some(caps) = HSL_RE.captures(value) {
        let h: f32 = caps[1].parse().ok()?;
        let s: f32 = caps[2].parse::<f32>().ok()? / 100.0;
        let l: f32 = caps[3].parse::<f32>().ok()? / 100.0;
        let a: f32 = caps
            .get(4)
            .map(|m| m.as_str().parse().unwrap_or(1.0))
            .unwrap_or(1.0);
        let (r, g, b) = hsl_to_rgb(h, s, l);
        return Some(Rgba {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
        });
    }
    None
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let expand = |c: u8| (c << 4) | c;
    match hex.len() {
        3 => {
            let raw = u16::from_str_radix(hex, 16).ok()? as u32;
            Some(Rgba {
                r: expand(((raw >> 8) & 0xF) as u8),
                g: expand(((raw >> 4) & 0xF) as u8),
                b: expand((raw & 0xF) as u8),
                a: 1.0,
            })
        }
        6 => {
            let raw = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgba {
                r: ((raw >> 16) & 0xFF) as u8,
                g: ((raw >> 8) & 0xFF) as u8,
                b: (raw & 0xFF) as u8,
                a: 1.0,
            })
        }
        8 => {
            let raw = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgba {
                r: ((raw >> 24) & 0xFF) as u8,
                g: ((raw >> 16) & 0xFF) as u8,
                b: ((raw >> 8) & 0xFF) as u8,
                a: (raw & 0xFF) as f32 / 255.0,
            })
        }
        _ => None,
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0) / 360.0;
    if s <= 0.0 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round() as u8
    };
    (
        channel(h + 1.0 / 3.0),
        channel(h),
        channel(h - 1.0 / 3.0),
    )
}
