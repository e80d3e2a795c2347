use log::{debug, info, warn};

use crate::backend::RenderBackend;
use crate::clipping::{ClipUpdate, ClippingCoordinator};
use crate::config::{ViewerConfig, check_opacity};
use crate::enums::{BrainPreset, LodLevel, RenderMode, ViewDirection, VolumeRole};
use crate::error::{ConfigurationError, ViewerError};
use crate::lod_manager::LodStateManager;
use crate::lod_unit::{LodRenderUnit, VisualAppearance};
use crate::pyramid::ResolutionPyramid;
use crate::scheduler::{Clock, Scheduler, SystemClock, Task};
use crate::throttle::{FrameStats, RenderThrottler};
use crate::transfer_function::{PiecewiseFunction, TransferFunctionCache};
use crate::volume::{Bounds, LabelSummary, VolumeError, VoxelField};
use crate::volume_loader::{LoadError, VolumeLoader};
use crate::zoom::{SmoothZoom, ZoomStep};

/// Vertical view angle the camera is framed for, in degrees.
const VIEW_ANGLE_DEG: f64 = 30.0;

/// Interactive viewer for one anatomy volume and an optional mask.
///
/// Single threaded. The host calls [`Viewer::tick`] once per animation frame
/// and forwards pointer events to [`Viewer::start_interaction`],
/// [`Viewer::end_interaction`] and [`Viewer::wheel`].
pub struct Viewer<B: RenderBackend> {
    backend: B,
    config: ViewerConfig,
    scheduler: Scheduler,
    throttler: RenderThrottler,
    zoom: SmoothZoom,
    lod: LodStateManager,
    clipping: ClippingCoordinator,
    transfer_functions: TransferFunctionCache,
    dims: (usize, usize, usize),
    bounds: Bounds,
    intensity_range: (f64, f64),
    brain_preset: BrainPreset,
    brain_opacity: f64,
    mask_opacity: f64,
    mask_visible: bool,
    mask_summary: Option<LabelSummary>,
    /// A pointer drag is held. Together with a running zoom animation this
    /// decides when interaction is really over.
    dragging: bool,
    destroyed: bool,
}

impl<B: RenderBackend> Viewer<B> {
    pub fn new(backend: B, config: ViewerConfig, anatomy: VoxelField) -> Result<Self, ViewerError> {
        Self::with_clock(backend, config, anatomy, SystemClock)
    }

    pub fn with_clock(
        backend: B,
        config: ViewerConfig,
        anatomy: VoxelField,
        clock: impl Clock + 'static,
    ) -> Result<Self, ViewerError> {
        config.validate()?;

        let dims = anatomy.dims();
        let bounds = anatomy.bounds();
        let (lo, hi) = anatomy.scalar_range();
        let intensity_range = (lo as f64, hi as f64);
        let appearance = &config.appearance;

        let mut viewer = Self {
            backend,
            scheduler: Scheduler::new(clock),
            throttler: RenderThrottler::new(config.target_fps),
            zoom: SmoothZoom::new(config.zoom.clone()),
            lod: LodStateManager::new(config.lod.clone()),
            clipping: ClippingCoordinator::new(bounds),
            transfer_functions: TransferFunctionCache::new(intensity_range),
            dims,
            bounds,
            intensity_range,
            brain_preset: appearance.brain_preset,
            brain_opacity: appearance.brain_opacity,
            mask_opacity: appearance.mask_opacity,
            mask_visible: appearance.mask_visible,
            mask_summary: None,
            dragging: false,
            destroyed: false,
            config,
        };

        let pyramid = ResolutionPyramid::build(anatomy);
        let appearance = VisualAppearance::new(
            viewer.transfer_functions.get(viewer.brain_preset),
            viewer.anatomy_opacity(),
        );
        let unit = LodRenderUnit::new(
            VolumeRole::Anatomy,
            &pyramid,
            appearance,
            false,
            &viewer.config.tiers,
        );
        viewer.register(unit);
        viewer.apply_view(ViewDirection::default());
        viewer.force_render();

        info!(
            "Viewer ready: {}x{}x{} voxels, intensity {lo}..{hi}",
            dims.0, dims.1, dims.2
        );
        Ok(viewer)
    }

    /// Load the anatomy, and optionally a mask, through `loader`. Any load
    /// failure aborts construction.
    pub async fn load(
        backend: B,
        config: ViewerConfig,
        loader: &dyn VolumeLoader,
        anatomy: &str,
        mask: Option<&str>,
        clock: impl Clock + 'static,
    ) -> Result<Self, ViewerError> {
        let anatomy = loader.load(anatomy).await.map_err(ViewerError::Construction)?;
        let mask = match mask {
            Some(location) => Some(loader.load(location).await.map_err(ViewerError::Construction)?),
            None => None,
        };

        let mut viewer = Self::with_clock(backend, config, anatomy, clock)?;
        if let Some(mask) = mask {
            viewer.attach_mask(mask).map_err(|err| match err {
                ViewerError::LateResource(source) => ViewerError::Construction(source),
                other => other,
            })?;
        }
        Ok(viewer)
    }

    /// Fetch and attach a mask after the anatomy is already interactive. On
    /// failure the anatomy, and any mask already shown, are left untouched.
    pub async fn load_mask(&mut self, loader: &dyn VolumeLoader, location: &str) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        match loader.load(location).await {
            Ok(mask) => self.attach_mask(mask),
            Err(err) => {
                warn!("Mask {location} failed to load: {err}");
                Err(ViewerError::LateResource(err))
            }
        }
    }

    /// Attach a segmentation mask, replacing any previous one.
    pub fn attach_mask(&mut self, mask: VoxelField) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        if mask.dims() != self.dims {
            return Err(ViewerError::LateResource(LoadError::Volume(
                VolumeError::DimensionMismatch {
                    expected: self.dims,
                    actual: mask.dims(),
                },
            )));
        }

        if let Some(previous) = self.lod.remove_unit(VolumeRole::Mask) {
            previous.release(&mut self.backend);
        }

        self.mask_summary = mask.label_summary();
        let pyramid = ResolutionPyramid::build(mask);
        let appearance = VisualAppearance::new(
            self.transfer_functions.mask(),
            PiecewiseFunction::mask(self.mask_opacity),
        );
        let unit = LodRenderUnit::new(VolumeRole::Mask, &pyramid, appearance, true, &self.config.tiers);
        self.register(unit);
        self.backend.set_visibility(VolumeRole::Mask, self.mask_visible);
        self.force_render();

        info!(
            "Mask attached: {} labelled voxels",
            self.mask_summary.as_ref().map_or(0, |s| s.voxel_count)
        );
        Ok(())
    }

    /// Clip, attach to the renderer, then hand to the LOD manager, which
    /// brings the unit to the current level.
    fn register(&mut self, mut unit: LodRenderUnit) {
        self.clipping.apply_to_unit(&mut unit);
        self.backend
            .attach_volume(unit.role(), unit.active_mapper(), unit.appearance());
        self.lod.add_unit(unit, &mut self.backend);
    }

    /// Run everything due on this frame.
    pub fn tick(&mut self) {
        if self.destroyed {
            return;
        }
        for (handle, task) in self.scheduler.take_due() {
            match task {
                Task::RenderFrame => {
                    if self.throttler.on_frame(handle, &self.scheduler) {
                        self.backend.render();
                    }
                }
                Task::ZoomStep => match self.zoom.on_step(handle, &mut self.scheduler) {
                    ZoomStep::Apply(factor) => {
                        self.backend.camera().zoom(factor);
                        self.request_render();
                    }
                    ZoomStep::Finished => {
                        if !self.dragging {
                            self.lod.end_interaction(&mut self.scheduler);
                        }
                    }
                    ZoomStep::Stale => {}
                },
                Task::LodTransition(target) => {
                    if self
                        .lod
                        .on_timer(handle, target, &mut self.scheduler, &mut self.backend)
                    {
                        self.force_render();
                    }
                }
            }
        }
    }

    /// Pointer down. Drops every unit to the fast tier.
    pub fn start_interaction(&mut self) {
        if self.destroyed {
            return;
        }
        self.dragging = true;
        self.enter_fast();
    }

    /// Pointer up. The climb back to full quality waits for a running zoom
    /// animation to finish.
    pub fn end_interaction(&mut self) {
        if self.destroyed {
            return;
        }
        self.dragging = false;
        if !self.zoom.is_animating() {
            self.lod.end_interaction(&mut self.scheduler);
        }
    }

    /// Feed one raw wheel delta. Positive values zoom in.
    pub fn wheel(&mut self, delta: f64) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        if !delta.is_finite() {
            return Err(ConfigurationError::InvalidValue {
                name: "wheel delta",
                reason: format!("{delta} is not finite"),
            }
            .into());
        }
        self.enter_fast();
        self.zoom.add_delta(delta, &mut self.scheduler);
        Ok(())
    }

    fn enter_fast(&mut self) {
        if self
            .lod
            .start_interaction(&mut self.scheduler, &mut self.backend)
        {
            self.request_render();
        }
    }

    /// Redraw as soon as the frame budget allows.
    pub fn request_render(&mut self) {
        if self.throttler.request(&mut self.scheduler) {
            self.backend.render();
        }
    }

    pub fn force_render(&mut self) {
        self.throttler.force(&mut self.scheduler);
        self.backend.render();
    }

    pub fn set_mask_visible(&mut self, visible: bool) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        self.mask_visible = visible;
        if self.lod.unit(VolumeRole::Mask).is_some() {
            self.backend.set_visibility(VolumeRole::Mask, visible);
            self.force_render();
        }
        Ok(())
    }

    pub fn set_brain_opacity(&mut self, opacity: f64) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        check_opacity("brain", opacity)?;
        self.brain_opacity = opacity;

        let range = self.intensity_range;
        let threshold = self.brain_threshold();
        if let Some(unit) = self.lod.unit_mut(VolumeRole::Anatomy) {
            unit.appearance_mut()
                .opacity
                .rebuild_anatomy(range, threshold, opacity);
            self.backend
                .update_appearance(VolumeRole::Anatomy, unit.appearance());
        }
        self.force_render();
        Ok(())
    }

    pub fn set_mask_opacity(&mut self, opacity: f64) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        check_opacity("mask", opacity)?;
        self.mask_opacity = opacity;

        if let Some(unit) = self.lod.unit_mut(VolumeRole::Mask) {
            unit.appearance_mut().opacity.rebuild_mask(opacity);
            self.backend
                .update_appearance(VolumeRole::Mask, unit.appearance());
            self.force_render();
        }
        Ok(())
    }

    /// Apply partial per-axis clip ranges in percent. Invalid input leaves
    /// every axis unchanged.
    pub fn set_clip_planes(&mut self, update: ClipUpdate) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        self.clipping.update(&update)?;
        for unit in self.lod.units_mut() {
            self.clipping.apply_to_unit(unit);
            self.backend.bind_mapper(unit.role(), unit.active_mapper());
        }
        self.force_render();
        Ok(())
    }

    pub fn set_brain_preset(&mut self, name: &str) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        let preset: BrainPreset = name.parse()?;
        self.brain_preset = preset;

        let color = self.transfer_functions.get(preset);
        if let Some(unit) = self.lod.unit_mut(VolumeRole::Anatomy) {
            unit.appearance_mut().color = color;
            self.backend
                .update_appearance(VolumeRole::Anatomy, unit.appearance());
        }
        self.force_render();
        Ok(())
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        if self
            .lod
            .set_render_mode(mode, &mut self.scheduler, &mut self.backend)
        {
            self.force_render();
        }
        Ok(())
    }

    pub fn reset_camera(&mut self) -> Result<(), ViewerError> {
        self.set_view(ViewDirection::default())
    }

    pub fn set_view(&mut self, direction: ViewDirection) -> Result<(), ViewerError> {
        self.ensure_alive()?;
        self.apply_view(direction);
        self.force_render();
        Ok(())
    }

    pub fn set_view_named(&mut self, name: &str) -> Result<(), ViewerError> {
        let direction: ViewDirection = name.parse()?;
        self.set_view(direction)
    }

    fn apply_view(&mut self, direction: ViewDirection) {
        if self.zoom.cancel(&mut self.scheduler) && !self.dragging {
            self.lod.end_interaction(&mut self.scheduler);
        }

        let center = self.bounds.center();
        let radius = self.bounds.diagonal() / 2.0;
        let distance = radius / (VIEW_ANGLE_DEG / 2.0).to_radians().sin();
        let d = direction.direction();
        let camera = self.backend.camera();
        camera.set_focal_point(center);
        camera.set_position([
            center[0] + d[0] * distance,
            center[1] + d[1] * distance,
            center[2] + d[2] * distance,
        ]);
        camera.set_view_up(direction.view_up());
        debug!("Camera set to {direction:?} view");
    }

    /// Anatomy dimensions as (nx, ny, nz).
    pub fn dimensions(&self) -> (usize, usize, usize) {
        self.dims
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn lod_level(&self) -> LodLevel {
        self.lod.level()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.lod.render_mode()
    }

    pub fn is_interacting(&self) -> bool {
        self.lod.is_interacting()
    }

    pub fn unit(&self, role: VolumeRole) -> Option<&LodRenderUnit> {
        self.lod.unit(role)
    }

    pub fn has_mask(&self) -> bool {
        self.lod.unit(VolumeRole::Mask).is_some()
    }

    pub fn mask_summary(&self) -> Option<&LabelSummary> {
        self.mask_summary.as_ref()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.throttler.stats()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Cancel all deferred work, then release every volume. Later calls and
    /// ticks do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.throttler.cancel(&mut self.scheduler);
        self.zoom.cancel(&mut self.scheduler);
        for unit in self.lod.drain_units(&mut self.scheduler) {
            unit.release(&mut self.backend);
        }
        self.scheduler.clear();
        self.mask_summary = None;
        self.dragging = false;
        self.destroyed = true;
        info!("Viewer destroyed");
    }

    fn ensure_alive(&self) -> Result<(), ViewerError> {
        if self.destroyed {
            Err(ViewerError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn brain_threshold(&self) -> f64 {
        let (lo, hi) = self.intensity_range;
        lo + (hi - lo) * self.config.appearance.brain_threshold
    }

    fn anatomy_opacity(&self) -> PiecewiseFunction {
        PiecewiseFunction::anatomy(self.intensity_range, self.brain_threshold(), self.brain_opacity)
    }
}

impl<B: RenderBackend> Drop for Viewer<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
