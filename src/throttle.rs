use std::time::Duration;

use log::trace;
use web_time::Instant;

use crate::scheduler::{Scheduler, Task, TimerHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_rendered: u64,
    /// Requests absorbed into an already pending frame.
    pub requests_coalesced: u64,
}

/// Rate limits redraws to a frame budget.
///
/// At most one deferred frame is ever pending; requests arriving while it is
/// pending collapse into it.
#[derive(Debug)]
pub struct RenderThrottler {
    frame_budget: Duration,
    last_render: Option<Instant>,
    pending: Option<TimerHandle>,
    stats: FrameStats,
}

impl RenderThrottler {
    pub fn new(target_fps: f64) -> Self {
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / target_fps),
            last_render: None,
            pending: None,
            stats: FrameStats::default(),
        }
    }

    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Best-effort redraw. Returns `true` when the caller should render now.
    pub fn request(&mut self, scheduler: &mut Scheduler) -> bool {
        let now = scheduler.now();
        let budget_elapsed = self
            .last_render
            .is_none_or(|last| now.duration_since(last) >= self.frame_budget);

        if budget_elapsed && self.pending.is_none() {
            self.mark_rendered(now);
            return true;
        }

        if self.pending.is_none() {
            self.pending = Some(scheduler.schedule_frame(Task::RenderFrame));
        } else {
            self.stats.requests_coalesced += 1;
            trace!("Render request coalesced into pending frame");
        }
        false
    }

    /// Unconditional redraw. The caller renders immediately; any pending
    /// deferred frame is dropped since it would show the same state.
    pub fn force(&mut self, scheduler: &mut Scheduler) {
        self.cancel(scheduler);
        self.mark_rendered(scheduler.now());
    }

    /// Handle a fired [`Task::RenderFrame`]. Returns `true` when the caller
    /// should render.
    pub fn on_frame(&mut self, handle: TimerHandle, scheduler: &Scheduler) -> bool {
        if self.pending != Some(handle) {
            return false;
        }
        self.pending = None;
        self.mark_rendered(scheduler.now());
        true
    }

    pub fn cancel(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
    }

    fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
        self.stats.frames_rendered += 1;
    }
}
