//! # Engine Configuration
//!
//! Settings for the renderer and the scene, plus the level collision mask
//! format. All types have sensible defaults so a missing file section falls
//! back cleanly.

use super::{Config, ConfigError};
use crate::scene::Rect;
use serde::{Deserialize, Serialize};

/// # Renderer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Drawable width in pixels
    pub width: u32,
    /// Drawable height in pixels
    pub height: u32,
    /// RGB colour used by `Renderer::clear`
    pub clear_color: [f32; 3],
    /// Number of texture units a single program may use
    pub max_texture_units: u32,
}

impl RendererConfig {
    /// Create a renderer configuration for a drawable of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the clear colour
    #[must_use]
    pub const fn with_clear_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.clear_color = [r, g, b];
        self
    }

    /// Set the texture unit limit
    #[must_use]
    pub const fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    /// Width over height
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "drawable size must be non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        if self.max_texture_units == 0 {
            return Err("at least one texture unit is required".to_string());
        }
        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(format!("clear colour out of range: {:?}", self.clear_color));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 854,
            height: 480,
            clear_color: [0.0, 0.0, 0.0],
            max_texture_units: 16,
        }
    }
}

/// # Scene Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Layer that `Scene::add_instance` uses
    pub default_layer: usize,
    /// Truncate translations to whole units when building transforms
    pub pixel_snap: bool,
}

impl SceneConfig {
    /// Enable or disable pixel snapping
    #[must_use]
    pub const fn with_pixel_snap(mut self, enabled: bool) -> Self {
        self.pixel_snap = enabled;
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_layer: 1,
            pixel_snap: false,
        }
    }
}

/// # Complete Engine Configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rendering settings
    pub renderer: RendererConfig,
    /// Scene settings
    pub scene: SceneConfig,
}

impl EngineConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate().map_err(ConfigError::Invalid)
    }
}

impl Config for EngineConfig {}

/// Static collision rectangles of a level, in world units
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelMask {
    /// Solid areas
    pub rects: Vec<Rect>,
}

impl Config for LevelMask {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scene.default_layer, 1);
        assert!(!config.scene.pixel_snap);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let text = "[renderer]\nwidth = 320\nheight = 240\n\n[scene]\npixel_snap = true\n";
        let config = EngineConfig::from_str_with_format(text, ConfigFormat::Toml).unwrap();

        assert_eq!(config.renderer.width, 320);
        assert_eq!(config.renderer.max_texture_units, 16);
        assert!(config.scene.pixel_snap);
        assert_eq!(config.scene.default_layer, 1);
    }

    #[test]
    fn test_level_mask_from_ron() {
        let text = "(rects: [(x: 0.0, y: 0.0, w: 32.0, h: 8.0), (x: 64.0, y: 0.0, w: 8.0, h: 64.0)])";
        let mask = LevelMask::from_str_with_format(text, ConfigFormat::Ron).unwrap();
        assert_eq!(mask.rects.len(), 2);
        assert_eq!(mask.rects[1].h, 64.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("sprite_engine_config_{}.toml", std::process::id()));
        let path = path.to_str().unwrap();

        let config = EngineConfig {
            renderer: RendererConfig::new(640, 360).with_clear_color(0.1, 0.2, 0.3),
            scene: SceneConfig::default().with_pixel_snap(true),
        };
        config.save_to_file(path).unwrap();
        let loaded = EngineConfig::load_from_file(path).unwrap();
        let _ = std::fs::remove_file(path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = EngineConfig::load_from_file("settings.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_size_rejected() {
        let config = EngineConfig {
            renderer: RendererConfig::new(0, 10),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
