use log::debug;

use crate::config::ZoomConfig;
use crate::scheduler::{Scheduler, Task, TimerHandle};

/// Outcome of one animation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomStep {
    /// Multiply the camera zoom by this factor and redraw.
    Apply(f64),
    /// The accumulator has drained; interaction is over.
    Finished,
    /// The tick belonged to a cancelled animation.
    Stale,
}

/// Turns raw wheel deltas into an exponentially decaying zoom.
///
/// Every tick applies a fixed fraction of what is left in the accumulator, so
/// one wheel notch spreads over several frames instead of snapping.
#[derive(Debug)]
pub struct SmoothZoom {
    config: ZoomConfig,
    accumulator: f64,
    animation: Option<TimerHandle>,
}

impl SmoothZoom {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            animation: None,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Accumulate one wheel delta. Positive deltas zoom in. The caller is
    /// responsible for signalling the start of interaction first.
    pub fn add_delta(&mut self, raw_delta: f64, scheduler: &mut Scheduler) {
        if !raw_delta.is_finite() {
            return;
        }
        let max_step = self.config.max_step;
        self.accumulator += (raw_delta * self.config.scale_factor).clamp(-max_step, max_step);

        if self.animation.is_none() {
            self.animation = Some(scheduler.schedule_frame(Task::ZoomStep));
        }
    }

    pub fn on_step(&mut self, handle: TimerHandle, scheduler: &mut Scheduler) -> ZoomStep {
        if self.animation != Some(handle) {
            return ZoomStep::Stale;
        }

        if self.accumulator.abs() < self.config.epsilon {
            self.animation = None;
            self.accumulator = 0.0;
            debug!("Zoom animation settled");
            return ZoomStep::Finished;
        }

        let applied = self.accumulator * self.config.smoothing;
        self.accumulator -= applied;
        self.animation = Some(scheduler.schedule_frame(Task::ZoomStep));
        ZoomStep::Apply(1.0 + applied)
    }

    /// Stop the animation and drop any remaining zoom. Returns whether an
    /// animation was running.
    pub fn cancel(&mut self, scheduler: &mut Scheduler) -> bool {
        self.accumulator = 0.0;
        match self.animation.take() {
            Some(handle) => {
                scheduler.cancel(handle);
                true
            }
            None => false,
        }
    }
}
