use crate::enums::Axis;
use crate::error::ConfigurationError;
use crate::lod_unit::LodRenderUnit;
use crate::volume::Bounds;

/// Half-space boundary; data on the side `normal` points away from is hidden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    pub origin: [f64; 3],
    pub normal: [f64; 3],
}

/// Visible slab along one axis, in percent of the volume extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    min: f64,
    max: f64,
}

impl Default for ClipRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
        }
    }
}

impl ClipRange {
    pub fn new(axis: Axis, min: f64, max: f64) -> Result<Self, ConfigurationError> {
        let valid = min.is_finite()
            && max.is_finite()
            && (0.0..=100.0).contains(&min)
            && (0.0..=100.0).contains(&max)
            && min <= max;
        if !valid {
            return Err(ConfigurationError::ClipRangeInvalid { axis, min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Partial per-axis clip update. Axes left as `None` keep their range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipUpdate {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
    pub z: Option<(f64, f64)>,
}

impl ClipUpdate {
    fn get(&self, axis: Axis) -> Option<(f64, f64)> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Global clipping shared by every registered unit.
#[derive(Debug)]
pub struct ClippingCoordinator {
    bounds: Bounds,
    ranges: [ClipRange; 3],
    planes: [ClipPlane; 6],
}

impl ClippingCoordinator {
    pub fn new(bounds: Bounds) -> Self {
        let ranges = [ClipRange::default(); 3];
        Self {
            bounds,
            ranges,
            planes: compute_planes(&bounds, &ranges),
        }
    }

    pub fn range(&self, axis: Axis) -> ClipRange {
        self.ranges[axis.index()]
    }

    /// Min and max plane for x, then y, then z.
    pub fn planes(&self) -> &[ClipPlane; 6] {
        &self.planes
    }

    pub fn set_clip_range(&mut self, axis: Axis, min: f64, max: f64) -> Result<(), ConfigurationError> {
        self.ranges[axis.index()] = ClipRange::new(axis, min, max)?;
        self.planes = compute_planes(&self.bounds, &self.ranges);
        Ok(())
    }

    /// Apply every axis in `update`, or none of them if any is invalid.
    pub fn update(&mut self, update: &ClipUpdate) -> Result<(), ConfigurationError> {
        let mut ranges = self.ranges;
        for axis in Axis::ALL {
            if let Some((min, max)) = update.get(axis) {
                ranges[axis.index()] = ClipRange::new(axis, min, max)?;
            }
        }
        self.ranges = ranges;
        self.planes = compute_planes(&self.bounds, &self.ranges);
        Ok(())
    }

    /// Replace the planes of all three mappers of `unit`.
    pub fn apply_to_unit(&self, unit: &mut LodRenderUnit) {
        for mapper in unit.mappers_mut() {
            mapper.set_clipping_planes(&self.planes);
        }
    }
}

fn compute_planes(bounds: &Bounds, ranges: &[ClipRange; 3]) -> [ClipPlane; 6] {
    let center = bounds.center();
    let mut planes = [ClipPlane {
        origin: center,
        normal: [0.0; 3],
    }; 6];

    for axis in Axis::ALL {
        let i = axis.index();
        let range = ranges[i];
        let extent = bounds.extent(i);

        let mut origin = center;
        let mut normal = [0.0; 3];
        origin[i] = bounds.min[i] + extent * range.min / 100.0;
        normal[i] = 1.0;
        planes[2 * i] = ClipPlane { origin, normal };

        origin[i] = bounds.min[i] + extent * range.max / 100.0;
        normal[i] = -1.0;
        planes[2 * i + 1] = ClipPlane { origin, normal };
    }
    planes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> ClippingCoordinator {
        ClippingCoordinator::new(Bounds {
            min: [0.0, 0.0, 0.0],
            max: [240.0, 240.0, 155.0],
        })
    }

    #[test]
    fn percent_range_maps_to_physical_planes() {
        let mut clipping = coordinator();
        clipping.set_clip_range(Axis::X, 30.0, 70.0).unwrap();

        let planes = clipping.planes();
        assert!((planes[0].origin[0] - 72.0).abs() < 1e-9);
        assert_eq!(planes[0].normal, [1.0, 0.0, 0.0]);
        assert!((planes[1].origin[0] - 168.0).abs() < 1e-9);
        assert_eq!(planes[1].normal, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn default_planes_sit_on_the_bounds() {
        let planes = *coordinator().planes();
        assert_eq!(planes[4].origin[2], 0.0);
        assert_eq!(planes[5].origin[2], 155.0);
        assert_eq!(planes[5].normal, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn invalid_range_leaves_state_unchanged() {
        let mut clipping = coordinator();
        clipping.set_clip_range(Axis::Y, 10.0, 20.0).unwrap();
        let before = *clipping.planes();

        assert!(clipping.set_clip_range(Axis::Y, 60.0, 40.0).is_err());
        assert!(clipping.set_clip_range(Axis::Y, -1.0, 40.0).is_err());
        assert!(clipping.set_clip_range(Axis::Y, 0.0, f64::NAN).is_err());
        assert_eq!(*clipping.planes(), before);
        assert_eq!(clipping.range(Axis::Y).max(), 20.0);
    }

    #[test]
    fn partial_update_is_all_or_nothing() {
        let mut clipping = coordinator();
        let result = clipping.update(&ClipUpdate {
            x: Some((10.0, 90.0)),
            z: Some((50.0, 101.0)),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(ConfigurationError::ClipRangeInvalid { axis: Axis::Z, .. })
        ));
        assert_eq!(clipping.range(Axis::X), ClipRange::default());

        clipping
            .update(&ClipUpdate {
                x: Some((10.0, 90.0)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(clipping.range(Axis::X).min(), 10.0);
        assert_eq!(clipping.range(Axis::Z), ClipRange::default());
    }
}
