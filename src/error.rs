use thiserror::Error;

use crate::enums::Axis;
use crate::volume_loader::LoadError;

/// A mutation or tuning value was rejected. Prior state is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unknown brain preset \"{0}\"")]
    UnknownPreset(String),

    #[error("Unknown view direction \"{0}\"")]
    UnknownView(String),

    #[error("Unknown render mode \"{0}\"")]
    UnknownRenderMode(String),

    #[error("{name} opacity {value} is outside [0, 1]")]
    OpacityOutOfRange { name: &'static str, value: f64 },

    #[error("Clip range [{min}, {max}] on axis {axis} must satisfy 0 <= min <= max <= 100")]
    ClipRangeInvalid { axis: Axis, min: f64, max: f64 },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Viewer construction failed: {0}")]
    Construction(#[source] LoadError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Late volume failed to load: {0}")]
    LateResource(#[source] LoadError),

    #[error("Viewer has been destroyed")]
    Destroyed,
}
