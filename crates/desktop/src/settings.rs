use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use purikura_core::capture::domain::capture_config::{CaptureConfig, CapturePreset};
use purikura_core::shared::constants::{
    DECORATION_ASSET_NAME, DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    High,
    Medium,
    Low,
}

impl Preset {
    pub const ALL: &[Preset] = &[Preset::High, Preset::Medium, Preset::Low];
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Preset::High => write!(f, "High"),
            Preset::Medium => write!(f, "Medium (640x480)"),
            Preset::Low => write!(f, "Low (352x288)"),
        }
    }
}

impl From<Preset> for CapturePreset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::High => CapturePreset::High,
            Preset::Medium => CapturePreset::Medium,
            Preset::Low => CapturePreset::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub preset: Preset,
    /// Camera device; `None` opens the system default.
    #[serde(default)]
    pub device: Option<String>,
    /// Decoration image, by name or path.
    pub asset: String,
    /// Detection threshold in percent.
    pub confidence: u32,
    pub view_width: f32,
    pub view_height: f32,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preset: Preset::High,
            device: None,
            asset: DECORATION_ASSET_NAME.to_string(),
            confidence: 25,
            view_width: DEFAULT_VIEW_WIDTH as f32,
            view_height: DEFAULT_VIEW_HEIGHT as f32,
            dark_mode: true,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Purikura").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Could not save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        let config = CaptureConfig::default().with_preset(self.preset.into());
        match &self.device {
            Some(device) => config.with_device(device.clone()),
            None => config,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence.min(100) as f64 / 100.0
    }
}
