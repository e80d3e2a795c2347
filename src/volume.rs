use ndarray::{Array3, ShapeError};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Voxel buffer holds {actual} values but dimensions {dims:?} need {expected}")]
    ShapeMismatch {
        dims: (usize, usize, usize),
        expected: usize,
        actual: usize,
    },

    #[error("Volume has a zero dimension: {0:?}")]
    Empty((usize, usize, usize)),

    #[error("Spacing must be finite and positive, got {0:?}")]
    InvalidSpacing((f64, f64, f64)),

    #[error("Volume dimensions {actual:?} do not match anatomy dimensions {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ShapeError),
}

/// Axis aligned physical bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn diagonal(&self) -> f64 {
        (0..3)
            .map(|axis| self.extent(axis).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Immutable field of 16-bit intensities.
///
/// Data is stored as (depth, height, width), i.e. (z, y, x), with x varying
/// fastest. Dimensions and spacing are reported in (x, y, z) order.
#[derive(Debug, Clone)]
pub struct VoxelField {
    data: Array3<u16>,
    spacing: (f64, f64, f64),
    origin: [f64; 3],
}

impl VoxelField {
    pub fn new(data: Array3<u16>, spacing: (f64, f64, f64)) -> Result<Self, VolumeError> {
        let (depth, height, width) = data.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(VolumeError::Empty((width, height, depth)));
        }
        let (sx, sy, sz) = spacing;
        if [sx, sy, sz].iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(VolumeError::InvalidSpacing(spacing));
        }
        Ok(Self {
            data,
            spacing,
            origin: [0.0; 3],
        })
    }

    /// Build a field from a flat x-fastest buffer.
    pub fn from_raw(
        dims: (usize, usize, usize),
        spacing: (f64, f64, f64),
        voxels: Vec<u16>,
    ) -> Result<Self, VolumeError> {
        let (nx, ny, nz) = dims;
        let expected = nx * ny * nz;
        if voxels.len() != expected {
            return Err(VolumeError::ShapeMismatch {
                dims,
                expected,
                actual: voxels.len(),
            });
        }
        let data = Array3::from_shape_vec((nz, ny, nx), voxels)?;
        Self::new(data, spacing)
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// A coarser copy covering the same region, `factor` times the spacing.
    pub(crate) fn resampled(&self, data: Array3<u16>, factor: f64) -> Self {
        let (sx, sy, sz) = self.spacing;
        Self {
            data,
            spacing: (sx * factor, sy * factor, sz * factor),
            origin: self.origin,
        }
    }

    /// Dimensions as (nx, ny, nz).
    pub fn dims(&self) -> (usize, usize, usize) {
        let (depth, height, width) = self.data.dim();
        (width, height, depth)
    }

    pub fn spacing(&self) -> (f64, f64, f64) {
        self.spacing
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Get a reference to the underlying (z, y, x) data
    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    /// Physical box covered by the voxels, `dim * spacing` wide on each axis.
    pub fn bounds(&self) -> Bounds {
        let (nx, ny, nz) = self.dims();
        let (sx, sy, sz) = self.spacing;
        let o = self.origin;
        Bounds {
            min: o,
            max: [
                o[0] + nx as f64 * sx,
                o[1] + ny as f64 * sy,
                o[2] + nz as f64 * sz,
            ],
        }
    }

    /// Smallest and largest intensity in the field.
    pub fn scalar_range(&self) -> (u16, u16) {
        self.data
            .view()
            .into_par_iter()
            .fold(|| (u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
            .reduce(|| (u16::MAX, u16::MIN), |a, b| (a.0.min(b.0), a.1.max(b.1)))
    }

    /// Summarise the labelled (non-zero) voxels of a segmentation mask.
    ///
    /// Returns `None` when no voxel is labelled.
    pub fn label_summary(&self) -> Option<LabelSummary> {
        let (count, sum_x, sum_y, sum_z) = self
            .data
            .indexed_iter()
            .filter(|(_, v)| **v > 0)
            .fold((0usize, 0f64, 0f64, 0f64), |(n, x, y, z), ((iz, iy, ix), _)| {
                (n + 1, x + ix as f64, y + iy as f64, z + iz as f64)
            });
        if count == 0 {
            return None;
        }

        let (sx, sy, sz) = self.spacing;
        let n = count as f64;
        let centroid_voxel = [sum_x / n, sum_y / n, sum_z / n];
        let centroid = [
            self.origin[0] + centroid_voxel[0] * sx,
            self.origin[1] + centroid_voxel[1] * sy,
            self.origin[2] + centroid_voxel[2] * sz,
        ];
        let mid_x = self.dims().0 as f64 / 2.0;
        let hemisphere = if centroid_voxel[0] > mid_x {
            Hemisphere::Right
        } else {
            Hemisphere::Left
        };
        let volume_mm3 = n * sx * sy * sz;

        Some(LabelSummary {
            voxel_count: count,
            volume_mm3,
            volume_cc: volume_mm3 / 1000.0,
            centroid_voxel,
            centroid,
            hemisphere,
            midline_shift_mm: (centroid_voxel[0] - mid_x).abs() * sx,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Left,
    Right,
}

/// Size and position of the labelled region of a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub voxel_count: usize,
    pub volume_mm3: f64,
    pub volume_cc: f64,
    /// Centroid in voxel coordinates, (x, y, z).
    pub centroid_voxel: [f64; 3],
    /// Centroid in physical coordinates.
    pub centroid: [f64; 3],
    pub hemisphere: Hemisphere,
    pub midline_shift_mm: f64,
}
