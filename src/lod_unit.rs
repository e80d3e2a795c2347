use std::sync::Arc;

use crate::backend::RenderBackend;
use crate::clipping::ClipPlane;
use crate::config::TierConfig;
use crate::enums::{BlendMode, Interpolation, LodLevel, RenderMode, VolumeRole};
use crate::pyramid::{ResolutionPyramid, ResolutionTier};
use crate::transfer_function::{ColorTransferFunction, PiecewiseFunction};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub shade: bool,
    pub ambient: f64,
    pub diffuse: f64,
    pub specular: f64,
    pub specular_power: f64,
    pub interpolation: Interpolation,
}

impl ShadingParams {
    /// Shading for a unit displaying `level`.
    ///
    /// Fast is flat, fully ambient and nearest sampled. Normal in performance
    /// mode is also flat but keeps some diffuse term and linear sampling.
    /// Label volumes are always sampled nearest.
    pub fn for_level(level: LodLevel, mode: RenderMode, nearest_only: bool) -> Self {
        let interpolation = if nearest_only || level == LodLevel::Fast {
            Interpolation::Nearest
        } else {
            Interpolation::Linear
        };
        let (shade, ambient, diffuse, specular) = match (level, mode) {
            (LodLevel::Fast, _) => (false, 1.0, 0.0, 0.0),
            (LodLevel::Normal, RenderMode::Performance) => (false, 0.8, 0.2, 0.0),
            (LodLevel::Normal, RenderMode::Accuracy) => (true, 0.3, 0.7, 0.2),
            (LodLevel::Quality, _) => (true, 0.2, 0.7, 0.3),
        };
        Self {
            shade,
            ambient,
            diffuse,
            specular,
            specular_power: 10.0,
            interpolation,
        }
    }
}

/// Color, opacity and shading shared by every tier of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAppearance {
    pub color: Arc<ColorTransferFunction>,
    pub opacity: PiecewiseFunction,
    pub shading: ShadingParams,
}

impl VisualAppearance {
    pub fn new(color: Arc<ColorTransferFunction>, opacity: PiecewiseFunction) -> Self {
        Self {
            color,
            opacity,
            shading: ShadingParams::for_level(LodLevel::Quality, RenderMode::Accuracy, false),
        }
    }
}

/// Renderer-facing configuration of one tier.
#[derive(Debug, Clone)]
pub struct TierMapper {
    level: LodLevel,
    tier: Arc<ResolutionTier>,
    sample_distance: f64,
    max_samples_per_ray: u32,
    blend_mode: BlendMode,
    clipping_planes: Vec<ClipPlane>,
}

impl PartialEq for TierMapper {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && Arc::ptr_eq(&self.tier, &other.tier)
            && self.sample_distance == other.sample_distance
            && self.max_samples_per_ray == other.max_samples_per_ray
            && self.blend_mode == other.blend_mode
            && self.clipping_planes == other.clipping_planes
    }
}

impl TierMapper {
    pub fn level(&self) -> LodLevel {
        self.level
    }

    pub fn tier(&self) -> &Arc<ResolutionTier> {
        &self.tier
    }

    pub fn sample_distance(&self) -> f64 {
        self.sample_distance
    }

    pub fn max_samples_per_ray(&self) -> u32 {
        self.max_samples_per_ray
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn clipping_planes(&self) -> &[ClipPlane] {
        &self.clipping_planes
    }

    /// Remove every clipping plane and add `planes`.
    pub fn set_clipping_planes(&mut self, planes: &[ClipPlane]) {
        self.clipping_planes.clear();
        self.clipping_planes.extend_from_slice(planes);
    }
}

/// One logical volume rendered at three levels of detail.
///
/// The three mappers and the appearance are allocated together and released
/// together. Switching level only changes which mapper is bound and the
/// shading knobs of the shared appearance.
#[derive(Debug)]
pub struct LodRenderUnit {
    role: VolumeRole,
    /// Indexed by `LodLevel::index`.
    mappers: [TierMapper; 3],
    appearance: VisualAppearance,
    level: LodLevel,
    nearest_only: bool,
}

impl LodRenderUnit {
    pub fn new(
        role: VolumeRole,
        pyramid: &ResolutionPyramid,
        mut appearance: VisualAppearance,
        nearest_only: bool,
        tiers: &TierConfig,
    ) -> Self {
        let mappers = LodLevel::ALL.map(|level| {
            let settings = tiers.settings(level);
            TierMapper {
                level,
                tier: Arc::clone(pyramid.tier(level.tier())),
                sample_distance: settings.sample_distance,
                max_samples_per_ray: settings.max_samples_per_ray,
                blend_mode: BlendMode::Composite,
                clipping_planes: Vec::new(),
            }
        });
        appearance.shading =
            ShadingParams::for_level(LodLevel::Quality, RenderMode::Accuracy, nearest_only);

        Self {
            role,
            mappers,
            appearance,
            level: LodLevel::Quality,
            nearest_only,
        }
    }

    pub fn role(&self) -> VolumeRole {
        self.role
    }

    pub fn level(&self) -> LodLevel {
        self.level
    }

    pub fn is_nearest_only(&self) -> bool {
        self.nearest_only
    }

    pub fn mapper(&self, level: LodLevel) -> &TierMapper {
        &self.mappers[level.index()]
    }

    pub fn active_mapper(&self) -> &TierMapper {
        self.mapper(self.level)
    }

    pub fn mappers_mut(&mut self) -> impl Iterator<Item = &mut TierMapper> {
        self.mappers.iter_mut()
    }

    pub fn appearance(&self) -> &VisualAppearance {
        &self.appearance
    }

    /// Color and opacity may be changed freely; shading belongs to the LOD
    /// controller and is overwritten on the next level change.
    pub fn appearance_mut(&mut self) -> &mut VisualAppearance {
        &mut self.appearance
    }

    /// Display `level` under `mode`. Returns `false` when nothing changed.
    pub fn set_level<B: RenderBackend + ?Sized>(
        &mut self,
        level: LodLevel,
        mode: RenderMode,
        backend: &mut B,
    ) -> bool {
        let shading = ShadingParams::for_level(level, mode, self.nearest_only);
        if level == self.level && shading == self.appearance.shading {
            return false;
        }

        if level != self.level {
            self.level = level;
            backend.bind_mapper(self.role, &self.mappers[level.index()]);
        }
        if shading != self.appearance.shading {
            self.appearance.shading = shading;
            backend.update_appearance(self.role, &self.appearance);
        }
        true
    }

    /// Detach from the renderer and free the tiers.
    pub fn release<B: RenderBackend + ?Sized>(self, backend: &mut B) {
        backend.detach_volume(self.role);
    }
}
