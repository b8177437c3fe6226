use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub success: String,
    pub warning: String,
    pub error: String,
    pub text: String,
    pub text_dim: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: "#61dafb".to_string(),   // Electric blue
            secondary: "#1f4068".to_string(), // Cobalt
            accent: "#61dafb".to_string(),    // Electric blue
            success: "#00ff9d".to_string(),   // Neon green
            warning: "#ffa500".to_string(),   // Orange
            error: "#ff0000".to_string(),     // Red
            text: "#ffffff".to_string(),      // White
            text_dim: "#808080".to_string(),  // Gray
        }
    }
}

impl ColorScheme {
    pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some((r, g, b))
    }

    pub fn get_color(&self, color_name: &str) -> Color {
        let hex = match color_name {
            "primary" => &self.primary,
            "secondary" => &self.secondary,
            "accent" => &self.accent,
            "success" => &self.success,
            "warning" => &self.warning,
            "error" => &self.error,
            "text" => &self.text,
            "text_dim" => &self.text_dim,
            _ => &self.primary, // fallback
        };

        if let Some((r, g, b)) = Self::hex_to_rgb(hex) {
            Color::Rgb(r, g, b)
        } else {
            Color::White // fallback color
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub color_scheme: ColorScheme,
    /// Names of tweaks the user toggled on; stale names (no longer in the
    /// catalog or the custom store) are simply ignored at resolve time.
    #[serde(default)]
    pub enabled_tweaks: Vec<String>,
    #[serde(skip)]
    path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::default(),
            enabled_tweaks: Vec::new(),
            path: Self::get_config_path(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(Self::get_config_path())
    }

    pub fn load_from(config_path: PathBuf) -> Self {
        if let Ok(contents) = fs::read_to_string(&config_path) {
            if let Ok(mut config) = serde_json::from_str::<Config>(&contents) {
                config.path = config_path;
                return config;
            }
        }

        // If loading fails, create default config
        let default_config = Config {
            path: config_path,
            ..Config::default()
        };
        default_config.save();
        default_config
    }

    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(&self.path, json);
        }
    }

    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("idevice-tweaks");
        path.push("config.json");
        path
    }

    pub fn get_color_scheme(&self) -> &ColorScheme {
        &self.color_scheme
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_tweaks.iter().any(|n| n == name)
    }

    /// Toggles a tweak in the enabled set and persists the change.
    pub fn toggle_enabled(&mut self, name: &str) {
        if let Some(pos) = self.enabled_tweaks.iter().position(|n| n == name) {
            self.enabled_tweaks.remove(pos);
        } else {
            self.enabled_tweaks.push(name.to_string());
        }
        self.save();
    }
}
