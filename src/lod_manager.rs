//! Level-of-detail state machine.
//!
//! ```text
//!            start_interaction (always, cancels timers)
//!   quality ────────────────────────────────────────────► fast
//!   normal  ────────────────────────────────────────────► fast
//!
//!   fast ──end_interaction──► (normal_delay) ──► normal
//!   normal ──(quality_delay, accuracy mode only)──► quality
//! ```
//!
//! In performance mode normal is terminal and drawn flat.

use log::debug;

use crate::backend::RenderBackend;
use crate::config::LodConfig;
use crate::enums::{LodLevel, RenderMode, VolumeRole};
use crate::lod_unit::LodRenderUnit;
use crate::scheduler::{Scheduler, Task, TimerHandle};

#[derive(Debug)]
pub struct LodStateManager {
    config: LodConfig,
    units: Vec<LodRenderUnit>,
    level: LodLevel,
    mode: RenderMode,
    interacting: bool,
    /// The one debounce timer that may be outstanding.
    debounce: Option<TimerHandle>,
}

impl LodStateManager {
    pub fn new(config: LodConfig) -> Self {
        let mode = config.render_mode;
        Self {
            config,
            units: Vec::new(),
            level: mode.resting_level(),
            mode,
            interacting: false,
            debounce: None,
        }
    }

    pub fn level(&self) -> LodLevel {
        self.level
    }

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn has_pending_transition(&self) -> bool {
        self.debounce.is_some()
    }

    pub fn units(&self) -> &[LodRenderUnit] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [LodRenderUnit] {
        &mut self.units
    }

    pub fn unit(&self, role: VolumeRole) -> Option<&LodRenderUnit> {
        self.units.iter().find(|unit| unit.role() == role)
    }

    pub fn unit_mut(&mut self, role: VolumeRole) -> Option<&mut LodRenderUnit> {
        self.units.iter_mut().find(|unit| unit.role() == role)
    }

    /// Register a unit, bringing it to the current level and mode at once.
    pub fn add_unit<B: RenderBackend + ?Sized>(&mut self, mut unit: LodRenderUnit, backend: &mut B) {
        unit.set_level(self.level, self.mode, backend);
        self.units.push(unit);
    }

    pub fn remove_unit(&mut self, role: VolumeRole) -> Option<LodRenderUnit> {
        let index = self.units.iter().position(|unit| unit.role() == role)?;
        Some(self.units.remove(index))
    }

    /// Drop to the fast tier. Any pending debounce transition is cancelled
    /// first so it can never fire mid-interaction. Returns whether any unit
    /// changed.
    pub fn start_interaction<B: RenderBackend + ?Sized>(
        &mut self,
        scheduler: &mut Scheduler,
        backend: &mut B,
    ) -> bool {
        self.cancel_timers(scheduler);
        if !self.interacting {
            debug!("Interaction started");
        }
        self.interacting = true;
        self.apply(LodLevel::Fast, backend)
    }

    /// Begin the debounced climb back to the resting level.
    pub fn end_interaction(&mut self, scheduler: &mut Scheduler) {
        if !self.interacting {
            return;
        }
        self.interacting = false;
        self.cancel_timers(scheduler);
        debug!("Interaction ended, settling in {}ms", self.config.normal_delay_ms);
        self.debounce = Some(scheduler.schedule_after(
            self.config.normal_delay(),
            Task::LodTransition(LodLevel::Normal),
        ));
    }

    /// Switch render mode. When idle the resting level of the new mode is
    /// applied immediately and `true` is returned so the caller can force a
    /// render; while interacting the mode only takes effect once
    /// interaction ends.
    pub fn set_render_mode<B: RenderBackend + ?Sized>(
        &mut self,
        mode: RenderMode,
        scheduler: &mut Scheduler,
        backend: &mut B,
    ) -> bool {
        self.mode = mode;
        if self.interacting {
            return false;
        }
        self.cancel_timers(scheduler);
        self.apply(mode.resting_level(), backend);
        true
    }

    /// Handle a fired [`Task::LodTransition`]. Returns whether any unit
    /// changed.
    pub fn on_timer<B: RenderBackend + ?Sized>(
        &mut self,
        handle: TimerHandle,
        target: LodLevel,
        scheduler: &mut Scheduler,
        backend: &mut B,
    ) -> bool {
        if self.debounce != Some(handle) || self.interacting {
            return false;
        }
        self.debounce = None;

        let changed = self.apply(target, backend);
        if target == LodLevel::Normal && self.mode == RenderMode::Accuracy {
            self.debounce = Some(scheduler.schedule_after(
                self.config.quality_delay(),
                Task::LodTransition(LodLevel::Quality),
            ));
        }
        changed
    }

    pub fn cancel_timers(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.debounce.take() {
            scheduler.cancel(handle);
        }
    }

    /// Cancel timers and hand back every unit for release.
    pub fn drain_units(&mut self, scheduler: &mut Scheduler) -> Vec<LodRenderUnit> {
        self.cancel_timers(scheduler);
        std::mem::take(&mut self.units)
    }

    fn apply<B: RenderBackend + ?Sized>(&mut self, level: LodLevel, backend: &mut B) -> bool {
        if level != self.level {
            debug!("LOD {:?} -> {:?} ({:?})", self.level, level, self.mode);
        }
        self.level = level;
        let mut changed = false;
        for unit in &mut self.units {
            changed |= unit.set_level(level, self.mode, &mut *backend);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::RecordingBackend;
    use crate::config::TierConfig;
    use crate::lod_unit::VisualAppearance;
    use crate::pyramid::ResolutionPyramid;
    use crate::scheduler::ManualClock;
    use crate::transfer_function::{PiecewiseFunction, TransferFunctionCache};
    use crate::volume::VoxelField;

    struct Harness {
        clock: ManualClock,
        scheduler: Scheduler,
        backend: RecordingBackend,
        lod: LodStateManager,
    }

    impl Harness {
        fn new(mode: RenderMode) -> Self {
            let clock = ManualClock::new();
            let scheduler = Scheduler::new(clock.clone());
            let mut backend = RecordingBackend::new();
            let mut lod = LodStateManager::new(LodConfig {
                render_mode: mode,
                ..LodConfig::default()
            });
            lod.add_unit(make_unit(VolumeRole::Anatomy), &mut backend);
            Self {
                clock,
                scheduler,
                backend,
                lod,
            }
        }

        fn advance(&mut self, ms: u64) {
            for _ in 0..ms {
                self.clock.advance(Duration::from_millis(1));
                for (handle, task) in self.scheduler.take_due() {
                    if let Task::LodTransition(target) = task {
                        self.lod
                            .on_timer(handle, target, &mut self.scheduler, &mut self.backend);
                    }
                }
            }
        }

        fn start(&mut self) {
            self.lod
                .start_interaction(&mut self.scheduler, &mut self.backend);
        }

        fn end(&mut self) {
            self.lod.end_interaction(&mut self.scheduler);
        }
    }

    fn make_unit(role: VolumeRole) -> LodRenderUnit {
        let field = VoxelField::from_raw((4, 4, 4), (1.0, 1.0, 1.0), vec![1; 64]).unwrap();
        let pyramid = ResolutionPyramid::build(field);
        let cache = TransferFunctionCache::new((0.0, 1.0));
        let appearance = VisualAppearance::new(cache.mask(), PiecewiseFunction::mask(1.0));
        LodRenderUnit::new(role, &pyramid, appearance, false, &TierConfig::default())
    }

    #[test]
    fn starts_at_quality() {
        let harness = Harness::new(RenderMode::Accuracy);
        assert_eq!(harness.lod.level(), LodLevel::Quality);
        assert_eq!(harness.lod.units()[0].level(), LodLevel::Quality);
    }

    #[test]
    fn start_interaction_forces_fast_immediately() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.start();
        assert!(harness.lod.is_interacting());
        assert_eq!(harness.lod.units()[0].level(), LodLevel::Fast);
    }

    #[test]
    fn accuracy_mode_climbs_to_quality() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.start();
        harness.end();

        harness.advance(99);
        assert_eq!(harness.lod.level(), LodLevel::Fast);
        harness.advance(1);
        assert_eq!(harness.lod.level(), LodLevel::Normal);
        harness.advance(299);
        assert_eq!(harness.lod.level(), LodLevel::Normal);
        harness.advance(1);
        assert_eq!(harness.lod.level(), LodLevel::Quality);
        assert!(!harness.lod.has_pending_transition());
    }

    #[test]
    fn performance_mode_stops_at_flat_normal() {
        let mut harness = Harness::new(RenderMode::Performance);
        assert_eq!(harness.lod.level(), LodLevel::Normal);
        harness.start();
        harness.end();
        harness.advance(2000);

        let unit = &harness.lod.units()[0];
        assert_eq!(unit.level(), LodLevel::Normal);
        assert!(!unit.appearance().shading.shade);
        assert!(!harness.lod.has_pending_transition());
    }

    #[test]
    fn restarting_cancels_stale_timers() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.start();
        harness.end();
        harness.advance(50);
        harness.start();
        harness.end();
        harness.advance(80);
        harness.start();

        harness.advance(1000);
        assert_eq!(harness.lod.level(), LodLevel::Fast);
        assert_eq!(harness.scheduler.pending_count(), 0);
    }

    #[test]
    fn start_during_normal_cancels_quality_timer() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.start();
        harness.end();
        harness.advance(150);
        assert_eq!(harness.lod.level(), LodLevel::Normal);
        assert!(harness.lod.has_pending_transition());

        harness.start();
        harness.advance(1000);
        assert_eq!(harness.lod.level(), LodLevel::Fast);
    }

    #[test]
    fn render_mode_switch_when_idle_applies_at_once() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        let applied = harness.lod.set_render_mode(
            RenderMode::Performance,
            &mut harness.scheduler,
            &mut harness.backend,
        );
        assert!(applied);
        assert_eq!(harness.lod.units()[0].level(), LodLevel::Normal);
        assert!(!harness.lod.units()[0].appearance().shading.shade);
    }

    #[test]
    fn render_mode_switch_while_interacting_waits() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.start();
        let applied = harness.lod.set_render_mode(
            RenderMode::Performance,
            &mut harness.scheduler,
            &mut harness.backend,
        );
        assert!(!applied);
        assert_eq!(harness.lod.level(), LodLevel::Fast);

        harness.end();
        harness.advance(1000);
        assert_eq!(harness.lod.level(), LodLevel::Normal);
    }

    #[test]
    fn late_unit_joins_at_current_level() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.start();
        harness
            .lod
            .add_unit(make_unit(VolumeRole::Mask), &mut harness.backend);
        assert_eq!(
            harness.lod.unit(VolumeRole::Mask).map(LodRenderUnit::level),
            Some(LodLevel::Fast)
        );
    }

    #[test]
    fn end_without_start_is_ignored() {
        let mut harness = Harness::new(RenderMode::Accuracy);
        harness.end();
        assert!(!harness.lod.has_pending_transition());
    }
}
