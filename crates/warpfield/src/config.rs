use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::geometry::{GridConfig, Plane};
use crate::uniforms::{RidgeMode, UniformDefaults, WarpParams};

/// Line colors of the three sheets, RGBA.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetColors {
    pub xy: [f32; 4],
    pub xz: [f32; 4],
    pub yz: [f32; 4],
}

impl Default for SheetColors {
    fn default() -> Self {
        Self {
            xy: [0.55, 0.85, 1.0, 1.0],
            xz: [0.45, 0.6, 1.0, 0.8],
            yz: [0.7, 0.5, 1.0, 0.8],
        }
    }
}

impl SheetColors {
    pub fn get(&self, plane: Plane) -> [f32; 4] {
        match plane {
            Plane::Xy => self.xy,
            Plane::Xz => self.xz,
            Plane::Yz => self.yz,
        }
    }
}

/// Boost the display engine applies on top of the canonical feed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowBoost {
    pub display_gain: f64,
    pub ridge_mode: RidgeMode,
}

impl Default for ShowBoost {
    fn default() -> Self {
        Self {
            display_gain: 40.0,
            ridge_mode: RidgeMode::Display,
        }
    }
}

impl ShowBoost {
    /// The patch a display engine receives for one canonical set.
    pub fn apply(&self, canonical: &WarpParams) -> WarpParams {
        let mut boosted = canonical.clone();
        boosted.ridge_mode = Some(self.ridge_mode.index());
        boosted.display_gain = Some(self.display_gain);
        boosted
    }
}

/// Everything an engine needs besides its GPU context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub camera: CameraConfig,
    pub clear_color: [f32; 4],
    pub sheet_colors: SheetColors,
    /// Initial state of the `cage` flag when the host does not set it.
    pub render_enabled: bool,
    pub defaults: UniformDefaults,
    pub show: ShowBoost,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            camera: CameraConfig::default(),
            clear_color: [0.02, 0.02, 0.05, 1.0],
            sheet_colors: SheetColors::default(),
            render_enabled: true,
            defaults: UniformDefaults::HOVER,
            show: ShowBoost::default(),
        }
    }
}

impl EngineConfig {
    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    pub fn save_yaml(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn load_yaml(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&yaml)?;
        Ok(config)
    }

    /// Load by extension: `.yaml`/`.yml` as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::load_yaml(path),
            _ => Self::load_json(path),
        }
    }
}
