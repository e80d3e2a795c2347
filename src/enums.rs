use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Physical axis of a volume, in (x, y, z) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Sample interpolation used by the renderer when reading a tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Composite,
    MaximumIntensity,
}

/// Which logical volume a render unit displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeRole {
    Anatomy,
    Mask,
}

/// Fixed resolution tier of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    Full,
    Half,
    Quarter,
}

impl TierKind {
    pub fn factor(self) -> usize {
        match self {
            TierKind::Full => 1,
            TierKind::Half => 2,
            TierKind::Quarter => 4,
        }
    }
}

/// Level of detail a render unit is displaying.
///
/// Ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodLevel {
    Fast,
    Normal,
    Quality,
}

impl LodLevel {
    pub const ALL: [LodLevel; 3] = [LodLevel::Fast, LodLevel::Normal, LodLevel::Quality];

    pub fn index(self) -> usize {
        match self {
            LodLevel::Fast => 0,
            LodLevel::Normal => 1,
            LodLevel::Quality => 2,
        }
    }

    pub fn tier(self) -> TierKind {
        match self {
            LodLevel::Fast => TierKind::Quarter,
            LodLevel::Normal => TierKind::Half,
            LodLevel::Quality => TierKind::Full,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Performance,
    #[default]
    Accuracy,
}

impl RenderMode {
    /// The level a unit settles on once interaction has quiesced.
    pub fn resting_level(self) -> LodLevel {
        match self {
            RenderMode::Performance => LodLevel::Normal,
            RenderMode::Accuracy => LodLevel::Quality,
        }
    }
}

impl FromStr for RenderMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "performance" => Ok(RenderMode::Performance),
            "accuracy" => Ok(RenderMode::Accuracy),
            _ => Err(ConfigurationError::UnknownRenderMode(s.to_string())),
        }
    }
}

/// Color preset for the anatomy volume.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainPreset {
    Grayscale,
    Skin,
    Bone,
    #[default]
    Mri,
}

impl BrainPreset {
    pub const ALL: [BrainPreset; 4] = [
        BrainPreset::Grayscale,
        BrainPreset::Skin,
        BrainPreset::Bone,
        BrainPreset::Mri,
    ];
}

impl FromStr for BrainPreset {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" => Ok(BrainPreset::Grayscale),
            "skin" => Ok(BrainPreset::Skin),
            "bone" => Ok(BrainPreset::Bone),
            "mri" => Ok(BrainPreset::Mri),
            _ => Err(ConfigurationError::UnknownPreset(s.to_string())),
        }
    }
}

/// Named camera direction. The volume is assumed to be in RAS orientation:
/// +x towards the patient's right, +y anterior, +z superior.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ViewDirection {
    #[default]
    Anterior,
    Posterior,
    Left,
    Right,
    Superior,
    Inferior,
}

impl ViewDirection {
    /// Unit vector from the focal point towards the camera.
    pub fn direction(self) -> [f64; 3] {
        match self {
            ViewDirection::Anterior => [0.0, 1.0, 0.0],
            ViewDirection::Posterior => [0.0, -1.0, 0.0],
            ViewDirection::Left => [-1.0, 0.0, 0.0],
            ViewDirection::Right => [1.0, 0.0, 0.0],
            ViewDirection::Superior => [0.0, 0.0, 1.0],
            ViewDirection::Inferior => [0.0, 0.0, -1.0],
        }
    }

    pub fn view_up(self) -> [f64; 3] {
        match self {
            ViewDirection::Superior | ViewDirection::Inferior => [0.0, 1.0, 0.0],
            _ => [0.0, 0.0, 1.0],
        }
    }
}

impl FromStr for ViewDirection {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anterior" | "front" => Ok(ViewDirection::Anterior),
            "posterior" | "back" => Ok(ViewDirection::Posterior),
            "left" => Ok(ViewDirection::Left),
            "right" => Ok(ViewDirection::Right),
            "superior" | "top" => Ok(ViewDirection::Superior),
            "inferior" | "bottom" => Ok(ViewDirection::Inferior),
            _ => Err(ConfigurationError::UnknownView(s.to_string())),
        }
    }
}

/// Order in which DICOM slices are stacked into a volume.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
