use std::fs;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    pub bg: String,
    pub fg: String,
    pub text_pending: String,
    pub accent: String,
    pub border: String,
    pub header_bg: String,
    pub header_fg: String,
    pub bar_filled: String,
    pub bar_empty: String,
    pub error: String,
    pub warning: String,
    pub success: String,
}

impl Theme {
    /// User themes live in `<config_dir>/kochr/themes/<name>.toml`.
    pub fn load(name: &str) -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let path = config_dir
            .join("kochr")
            .join("themes")
            .join(format!("{name}.toml"));
        let content = fs::read_to_string(&path).ok()?;
        toml::from_str::<Theme>(&content).ok()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            colors: ThemeColors::default(),
        }
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            bg: "#1e1e2e".to_string(),
            fg: "#cdd6f4".to_string(),
            text_pending: "#585b70".to_string(),
            accent: "#89b4fa".to_string(),
            border: "#45475a".to_string(),
            header_bg: "#313244".to_string(),
            header_fg: "#cdd6f4".to_string(),
            bar_filled: "#89b4fa".to_string(),
            bar_empty: "#313244".to_string(),
            error: "#f38ba8".to_string(),
            warning: "#f9e2af".to_string(),
            success: "#a6e3a1".to_string(),
        }
    }
}

impl ThemeColors {
    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6 {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return Color::Rgb(r, g, b);
            }
        }
        Color::White
    }

    pub fn bg(&self) -> Color { Self::parse_color(&self.bg) }
    pub fn fg(&self) -> Color { Self::parse_color(&self.fg) }
    pub fn text_pending(&self) -> Color { Self::parse_color(&self.text_pending) }
    pub fn accent(&self) -> Color { Self::parse_color(&self.accent) }
    pub fn border(&self) -> Color { Self::parse_color(&self.border) }
    pub fn header_bg(&self) -> Color { Self::parse_color(&self.header_bg) }
    pub fn header_fg(&self) -> Color { Self::parse_color(&self.header_fg) }
    pub fn bar_filled(&self) -> Color { Self::parse_color(&self.bar_filled) }
    pub fn bar_empty(&self) -> Color { Self::parse_color(&self.bar_empty) }
    pub fn error(&self) -> Color { Self::parse_color(&self.error) }
    pub fn warning(&self) -> Color { Self::parse_color(&self.warning) }
    pub fn success(&self) -> Color { Self::parse_color(&self.success) }
}
