use std::sync::Arc;

use half::f16;
use ndarray::{Array3, Zip};
use rayon::prelude::*;

use crate::enums::TierKind;
use crate::volume::{Bounds, VoxelField};

/// One fixed-resolution copy of a volume.
#[derive(Debug)]
pub struct ResolutionTier {
    kind: TierKind,
    voxels: VoxelField,
    /// Bounds of the source field. Shared by every tier of a pyramid.
    bounds: Bounds,
}

impl ResolutionTier {
    pub fn kind(&self) -> TierKind {
        self.kind
    }

    /// Dimensions as (nx, ny, nz).
    pub fn dims(&self) -> (usize, usize, usize) {
        self.voxels.dims()
    }

    pub fn spacing(&self) -> (f64, f64, f64) {
        self.voxels.spacing()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn voxels(&self) -> &VoxelField {
        &self.voxels
    }

    /// Raw native-endian u16 texels, x fastest, ready for a 16-bit texture upload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.voxels.data().as_slice().map(bytemuck::cast_slice)
    }

    /// Texels normalised to [0, 1] over `range`, for backends that cannot
    /// filter 16-bit integer 3D textures.
    pub fn half_float_texels(&self, range: (u16, u16)) -> Vec<f16> {
        let lo = range.0 as f32;
        let span = (range.1 as f32 - lo).max(1.0);
        self.voxels
            .data()
            .as_standard_layout()
            .as_slice()
            .unwrap_or_default()
            .par_iter()
            .map(|&v| f16::from_f32(((v as f32 - lo) / span).clamp(0.0, 1.0)))
            .collect()
    }
}

/// Full, half and quarter resolution tiers of one volume.
#[derive(Debug, Clone)]
pub struct ResolutionPyramid {
    pub full: Arc<ResolutionTier>,
    pub half: Arc<ResolutionTier>,
    pub quarter: Arc<ResolutionTier>,
}

impl ResolutionPyramid {
    /// Build the pyramid. The full tier takes the source field unchanged,
    /// the reduced tiers are nearest-neighbour samples so label boundaries
    /// stay hard.
    pub fn build(voxels: VoxelField) -> Self {
        let bounds = voxels.bounds();
        let (half, quarter) = rayon::join(
            || downsample(&voxels, TierKind::Half.factor()),
            || downsample(&voxels, TierKind::Quarter.factor()),
        );

        let tier = |kind, voxels| {
            Arc::new(ResolutionTier {
                kind,
                voxels,
                bounds,
            })
        };
        Self {
            full: tier(TierKind::Full, voxels),
            half: tier(TierKind::Half, half),
            quarter: tier(TierKind::Quarter, quarter),
        }
    }

    pub fn tier(&self, kind: TierKind) -> &Arc<ResolutionTier> {
        match kind {
            TierKind::Full => &self.full,
            TierKind::Half => &self.half,
            TierKind::Quarter => &self.quarter,
        }
    }
}

fn downsample(field: &VoxelField, factor: usize) -> VoxelField {
    let src = field.data();
    let (depth, height, width) = src.dim();
    let mut out = Array3::<u16>::zeros((
        depth.div_ceil(factor),
        height.div_ceil(factor),
        width.div_ceil(factor),
    ));

    Zip::indexed(&mut out).par_for_each(|(z, y, x), v| {
        *v = src[[
            (z * factor).min(depth - 1),
            (y * factor).min(height - 1),
            (x * factor).min(width - 1),
        ]];
    });

    field.resampled(out, factor as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(dims: (usize, usize, usize)) -> VoxelField {
        let n = dims.0 * dims.1 * dims.2;
        let voxels = (0..n).map(|i| i as u16).collect();
        VoxelField::from_raw(dims, (1.0, 1.5, 2.0), voxels).unwrap()
    }

    #[test]
    fn tier_dims_round_up_and_spacing_scales() {
        let pyramid = ResolutionPyramid::build(ramp((9, 6, 5)));

        assert_eq!(pyramid.full.dims(), (9, 6, 5));
        assert_eq!(pyramid.half.dims(), (5, 3, 3));
        assert_eq!(pyramid.quarter.dims(), (3, 2, 2));

        assert_eq!(pyramid.full.spacing(), (1.0, 1.5, 2.0));
        assert_eq!(pyramid.half.spacing(), (2.0, 3.0, 4.0));
        assert_eq!(pyramid.quarter.spacing(), (4.0, 6.0, 8.0));
    }

    #[test]
    fn tiers_share_source_bounds() {
        let pyramid = ResolutionPyramid::build(ramp((9, 6, 5)));
        let bounds = pyramid.full.bounds();
        assert_eq!(pyramid.half.bounds(), bounds);
        assert_eq!(pyramid.quarter.bounds(), bounds);
        assert_eq!(bounds.max, [9.0, 9.0, 10.0]);
    }

    #[test]
    fn reduced_tiers_take_nearest_sample() {
        let pyramid = ResolutionPyramid::build(ramp((5, 1, 1)));
        let half: Vec<u16> = pyramid.half.voxels().data().iter().copied().collect();
        let quarter: Vec<u16> = pyramid.quarter.voxels().data().iter().copied().collect();
        assert_eq!(half, vec![0, 2, 4]);
        assert_eq!(quarter, vec![0, 4]);
    }

    #[test]
    fn labels_are_never_blended() {
        // Alternating labels 1 and 4 must never produce intermediate values.
        let voxels = (0..64).map(|i| if i % 2 == 0 { 1 } else { 4 }).collect();
        let field = VoxelField::from_raw((4, 4, 4), (1.0, 1.0, 1.0), voxels).unwrap();
        let pyramid = ResolutionPyramid::build(field);
        for tier in [&pyramid.half, &pyramid.quarter] {
            assert!(tier.voxels().data().iter().all(|&v| v == 1 || v == 4));
        }
    }

    #[test]
    fn constant_field_stays_constant() {
        let field = VoxelField::from_raw((7, 5, 3), (1.0, 1.0, 1.0), vec![321; 105]).unwrap();
        let pyramid = ResolutionPyramid::build(field);
        for tier in [&pyramid.full, &pyramid.half, &pyramid.quarter] {
            assert!(tier.voxels().data().iter().all(|&v| v == 321));
        }
    }

    #[test]
    fn upload_views() {
        let field = VoxelField::from_raw((2, 1, 1), (1.0, 1.0, 1.0), vec![0, 1000]).unwrap();
        let pyramid = ResolutionPyramid::build(field);
        assert_eq!(pyramid.full.as_bytes().map(<[u8]>::len), Some(4));

        let texels = pyramid.full.half_float_texels((0, 1000));
        assert_eq!(texels, vec![f16::from_f32(0.0), f16::from_f32(1.0)]);
    }
}
