//! Viewer tuning.
//!
//! Every constant the LOD controller depends on lives here and can be loaded
//! from a TOML file. Only the ordering of the tier costs is load-bearing, the
//! numbers themselves are tuned by eye.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::{BrainPreset, LodLevel, RenderMode};
use crate::error::ConfigurationError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Redraw rate the throttler aims for
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,

    #[serde(default)]
    pub lod: LodConfig,

    #[serde(default)]
    pub zoom: ZoomConfig,

    #[serde(default)]
    pub tiers: TierConfig,

    #[serde(default)]
    pub appearance: AppearanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Delay after interaction ends before switching to the normal tier
    pub normal_delay_ms: u64,

    /// Further delay after reaching normal before switching to quality
    pub quality_delay_ms: u64,

    pub render_mode: RenderMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Zoom per unit of raw wheel delta
    pub scale_factor: f64,

    /// Largest zoom a single wheel event may add
    pub max_step: f64,

    /// Fraction of the remaining zoom applied each frame
    pub smoothing: f64,

    pub epsilon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    /// Ray sample step in physical units
    pub sample_distance: f64,

    pub max_samples_per_ray: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub fast: TierSettings,
    pub normal: TierSettings,
    pub quality: TierSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub brain_preset: BrainPreset,
    pub brain_opacity: f64,

    /// Fraction of the intensity range below which anatomy is transparent
    pub brain_threshold: f64,

    pub mask_opacity: f64,
    pub mask_visible: bool,
}

fn default_target_fps() -> f64 {
    30.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            lod: LodConfig::default(),
            zoom: ZoomConfig::default(),
            tiers: TierConfig::default(),
            appearance: AppearanceConfig::default(),
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            normal_delay_ms: 100,
            quality_delay_ms: 300,
            render_mode: RenderMode::Accuracy,
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.002,
            max_step: 0.3,
            smoothing: 0.15,
            epsilon: 0.001,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            fast: TierSettings {
                sample_distance: 4.0,
                max_samples_per_ray: 1000,
            },
            normal: TierSettings {
                sample_distance: 1.0,
                max_samples_per_ray: 2000,
            },
            quality: TierSettings {
                sample_distance: 0.5,
                max_samples_per_ray: 4000,
            },
        }
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            brain_preset: BrainPreset::Mri,
            brain_opacity: 0.8,
            brain_threshold: 0.1,
            mask_opacity: 0.9,
            mask_visible: true,
        }
    }
}

impl LodConfig {
    pub fn normal_delay(&self) -> Duration {
        Duration::from_millis(self.normal_delay_ms)
    }

    pub fn quality_delay(&self) -> Duration {
        Duration::from_millis(self.quality_delay_ms)
    }
}

impl TierConfig {
    pub fn settings(&self, level: LodLevel) -> TierSettings {
        match level {
            LodLevel::Fast => self.fast,
            LodLevel::Normal => self.normal,
            LodLevel::Quality => self.quality,
        }
    }
}

pub(crate) fn check_opacity(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::OpacityOutOfRange { name, value })
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        name,
        reason: reason.into(),
    }
}

impl ViewerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(invalid("target_fps", "must be positive"));
        }

        let zoom = &self.zoom;
        if !(zoom.smoothing > 0.0 && zoom.smoothing <= 1.0) {
            return Err(invalid("zoom.smoothing", "must be in (0, 1]"));
        }
        for (name, value) in [
            ("zoom.scale_factor", zoom.scale_factor),
            ("zoom.max_step", zoom.max_step),
            ("zoom.epsilon", zoom.epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, "must be positive"));
            }
        }

        let tiers = &self.tiers;
        for level in LodLevel::ALL {
            let settings = tiers.settings(level);
            if !(settings.sample_distance.is_finite() && settings.sample_distance > 0.0) {
                return Err(invalid("tiers.sample_distance", "must be positive"));
            }
            if settings.max_samples_per_ray == 0 {
                return Err(invalid("tiers.max_samples_per_ray", "must be non-zero"));
            }
        }
        if !(tiers.quality.sample_distance <= tiers.normal.sample_distance
            && tiers.normal.sample_distance <= tiers.fast.sample_distance)
        {
            return Err(invalid(
                "tiers",
                "sample distance must grow from quality to normal to fast",
            ));
        }

        let appearance = &self.appearance;
        check_opacity("brain", appearance.brain_opacity)?;
        check_opacity("mask", appearance.mask_opacity)?;
        if !(0.0..=1.0).contains(&appearance.brain_threshold) {
            return Err(invalid("appearance.brain_threshold", "must be in [0, 1]"));
        }
        Ok(())
    }
}
