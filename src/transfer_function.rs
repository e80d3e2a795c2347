use std::sync::Arc;

use crate::enums::BrainPreset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPoint {
    pub x: f64,
    pub rgb: [f64; 3],
}

/// Scalar to RGB mapping.
///
/// Linear functions interpolate between neighbouring points. Banded functions
/// return the color of the last point at or below the sample, so every scalar
/// range maps to exactly one color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTransferFunction {
    points: Vec<ColorPoint>,
    banded: bool,
}

impl ColorTransferFunction {
    fn linear(points: Vec<ColorPoint>) -> Self {
        Self {
            points,
            banded: false,
        }
    }

    fn banded(points: Vec<ColorPoint>) -> Self {
        Self {
            points,
            banded: true,
        }
    }

    pub fn points(&self) -> &[ColorPoint] {
        &self.points
    }

    pub fn is_banded(&self) -> bool {
        self.banded
    }

    pub fn evaluate(&self, x: f64) -> [f64; 3] {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return [0.0; 3],
        };
        if x <= first.x {
            return first.rgb;
        }
        if x >= last.x {
            return last.rgb;
        }

        let upper = self.points.partition_point(|p| p.x <= x);
        let a = &self.points[upper - 1];
        if self.banded {
            return a.rgb;
        }
        let b = &self.points[upper];
        let t = (x - a.x) / (b.x - a.x);
        [
            a.rgb[0] + (b.rgb[0] - a.rgb[0]) * t,
            a.rgb[1] + (b.rgb[1] - a.rgb[1]) * t,
            a.rgb[2] + (b.rgb[2] - a.rgb[2]) * t,
        ]
    }
}

/// Scalar to opacity mapping with linear interpolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PiecewiseFunction {
    points: Vec<(f64, f64)>,
}

impl PiecewiseFunction {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Replace all control points, keeping the allocation.
    pub fn set_points(&mut self, points: &[(f64, f64)]) {
        self.points.clear();
        self.points.extend_from_slice(points);
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        if x < first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        let upper = self.points.partition_point(|p| p.0 <= x);
        let (x0, y0) = self.points[upper - 1];
        let (x1, y1) = self.points[upper];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    /// Opacity ramp for the anatomy volume. Everything below `threshold`
    /// (absolute intensity) is transparent, above it opacity rises to
    /// `opacity` at the top of `range`.
    pub fn anatomy(range: (f64, f64), threshold: f64, opacity: f64) -> Self {
        let mut function = Self::default();
        function.rebuild_anatomy(range, threshold, opacity);
        function
    }

    pub fn rebuild_anatomy(&mut self, range: (f64, f64), threshold: f64, opacity: f64) {
        let (lo, hi) = range;
        let t = threshold.clamp(lo, hi);
        let span = hi - t;
        self.set_points(&[
            (lo, 0.0),
            (t, 0.0),
            (t + 0.15 * span, 0.2 * opacity),
            (t + 0.4 * span, 0.5 * opacity),
            (t + 0.7 * span, 0.8 * opacity),
            (hi, opacity),
        ]);
    }

    /// Label 0 is transparent, every class label gets `opacity`.
    pub fn mask(opacity: f64) -> Self {
        let mut function = Self::default();
        function.rebuild_mask(opacity);
        function
    }

    pub fn rebuild_mask(&mut self, opacity: f64) {
        self.set_points(&[
            (0.0, 0.0),
            (0.5, 0.0),
            (1.0, opacity),
            (MASK_MAX_LABEL, opacity),
        ]);
    }
}

const MASK_MAX_LABEL: f64 = 4.0;

/// Preset control points over a normalised [0, 1] intensity range.
fn preset_points(preset: BrainPreset) -> &'static [(f64, [f64; 3])] {
    match preset {
        BrainPreset::Grayscale => &[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])],
        BrainPreset::Skin => &[
            (0.0, [0.0, 0.0, 0.0]),
            (0.2, [0.55, 0.25, 0.15]),
            (0.5, [0.88, 0.6, 0.5]),
            (1.0, [1.0, 0.94, 0.86]),
        ],
        BrainPreset::Bone => &[
            (0.0, [0.0, 0.0, 0.0]),
            (0.3, [0.55, 0.45, 0.35]),
            (0.6, [0.9, 0.85, 0.75]),
            (1.0, [1.0, 1.0, 0.95]),
        ],
        BrainPreset::Mri => &[
            (0.0, [0.0, 0.0, 0.0]),
            (0.25, [0.3, 0.2, 0.35]),
            (0.5, [0.7, 0.55, 0.6]),
            (0.75, [0.95, 0.85, 0.8]),
            (1.0, [1.0, 1.0, 1.0]),
        ],
    }
}

/// Color functions for every anatomy preset plus the fixed mask scheme,
/// built once for one viewer.
#[derive(Debug)]
pub struct TransferFunctionCache {
    /// Indexed by `BrainPreset as usize`.
    presets: [Arc<ColorTransferFunction>; 4],
    mask: Arc<ColorTransferFunction>,
}

impl TransferFunctionCache {
    /// Scale every preset to the anatomy intensity `range`.
    pub fn new(range: (f64, f64)) -> Self {
        let (lo, hi) = range;
        let span = hi - lo;
        let presets = BrainPreset::ALL.map(|preset| {
            let points = preset_points(preset)
                .iter()
                .map(|&(t, rgb)| ColorPoint {
                    x: lo + t * span,
                    rgb,
                })
                .collect();
            Arc::new(ColorTransferFunction::linear(points))
        });

        // Background, then one band per class label.
        let mask = ColorTransferFunction::banded(vec![
            ColorPoint { x: 0.0, rgb: [0.0, 0.0, 0.0] },
            ColorPoint { x: 0.5, rgb: [1.0, 0.2, 0.2] },
            ColorPoint { x: 1.5, rgb: [1.0, 0.85, 0.1] },
            ColorPoint { x: 2.5, rgb: [0.2, 0.8, 0.3] },
            ColorPoint { x: 3.5, rgb: [0.2, 0.5, 1.0] },
        ]);

        Self {
            presets,
            mask: Arc::new(mask),
        }
    }

    pub fn get(&self, preset: BrainPreset) -> Arc<ColorTransferFunction> {
        Arc::clone(&self.presets[preset as usize])
    }

    pub fn mask(&self) -> Arc<ColorTransferFunction> {
        Arc::clone(&self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_scaled_to_range() {
        let cache = TransferFunctionCache::new((100.0, 1100.0));
        let gray = cache.get(BrainPreset::Grayscale);
        assert_eq!(gray.points()[0].x, 100.0);
        assert_eq!(gray.points()[1].x, 1100.0);
        assert_eq!(gray.evaluate(600.0), [0.5, 0.5, 0.5]);
        assert_eq!(gray.evaluate(0.0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn lookups_share_one_function() {
        let cache = TransferFunctionCache::new((0.0, 1.0));
        let a = cache.get(BrainPreset::Bone);
        let b = cache.get(BrainPreset::Bone);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &cache.get(BrainPreset::Skin)));
    }

    #[test]
    fn mask_colors_are_banded() {
        let cache = TransferFunctionCache::new((0.0, 1.0));
        let mask = cache.mask();
        assert!(mask.is_banded());
        assert_eq!(mask.evaluate(0.0), [0.0, 0.0, 0.0]);
        assert_eq!(mask.evaluate(1.0), [1.0, 0.2, 0.2]);
        assert_eq!(mask.evaluate(1.4), [1.0, 0.2, 0.2]);
        assert_eq!(mask.evaluate(2.0), [1.0, 0.85, 0.1]);
        assert_eq!(mask.evaluate(4.0), [0.2, 0.5, 1.0]);
    }

    #[test]
    fn anatomy_opacity_is_zero_below_threshold() {
        let function = PiecewiseFunction::anatomy((0.0, 1000.0), 200.0, 0.5);
        assert_eq!(function.points().len(), 6);
        assert_eq!(function.evaluate(100.0), 0.0);
        assert_eq!(function.evaluate(200.0), 0.0);
        assert_eq!(function.evaluate(1000.0), 0.5);
        assert!(function.evaluate(600.0) > 0.0);
    }

    #[test]
    fn rebuild_rewrites_points_in_place() {
        let mut function = PiecewiseFunction::mask(0.8);
        assert_eq!(function.evaluate(2.0), 0.8);
        function.rebuild_mask(0.3);
        assert_eq!(function.evaluate(2.0), 0.3);
        assert_eq!(function.evaluate(0.0), 0.0);
    }

    #[test]
    fn constant_range_does_not_divide_by_zero() {
        let function = PiecewiseFunction::anatomy((50.0, 50.0), 50.0, 1.0);
        assert_eq!(function.evaluate(50.0), 1.0);
        assert_eq!(function.evaluate(10.0), 0.0);
    }
}
