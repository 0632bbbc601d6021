//! Viewport configuration
//!
//! Every field has a default matching the hero section as shipped, so an
//! absent or partial TOML file is valid.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::surface::LogicalSize;

/// Env var naming an alternative config file.
pub const CONFIG_ENV: &str = "HERO_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "hero.toml";

/// Upper bound on the renderer's output pixel ratio.
pub const PIXEL_RATIO_LIMIT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Directory the site-absolute asset path is resolved against.
    pub site_root: PathBuf,
    pub asset_path: String,
    pub model_scale: f32,
    /// Radians added to the model's Y rotation per frame until interaction.
    pub auto_rotate_step: f32,
    pub attach_model_light: bool,
    pub enable_zoom: bool,
    pub max_pixel_ratio: f64,
    /// Used when the surface reports a zero size at mount.
    pub fallback_width: u32,
    pub fallback_height: u32,
    /// Key-value store holding the theme preference.
    pub storage_path: PathBuf,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            site_root: PathBuf::from("public"),
            asset_path: "/models/3d.glb".to_string(),
            model_scale: 1.2,
            auto_rotate_step: 0.005,
            attach_model_light: true,
            enable_zoom: false,
            max_pixel_ratio: PIXEL_RATIO_LIMIT,
            fallback_width: 400,
            fallback_height: 400,
            storage_path: PathBuf::from("storage.toml"),
        }
    }
}

impl ViewportConfig {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        Ok(config.sanitized())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load `$HERO_CONFIG`, else `hero.toml` if present, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if path.exists() {
            info!("loading viewport config from {}", path.display());
            Self::load_from_file(&path)
        } else {
            debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn fallback_size(&self) -> LogicalSize {
        LogicalSize::new(self.fallback_width, self.fallback_height)
    }

    /// Output pixel ratio for a display of the given density.
    pub fn pixel_ratio(&self, device_pixel_ratio: f64) -> f64 {
        device_pixel_ratio.min(self.max_pixel_ratio)
    }

    fn sanitized(mut self) -> Self {
        self.max_pixel_ratio = self.max_pixel_ratio.clamp(1.0, PIXEL_RATIO_LIMIT);
        self
    }
}
