//! Cooperative, single-threaded scheduling of deferred work.
//!
//! Nothing here blocks. Work is queued either for the next frame tick or for
//! an instant in the future, and is handed back to the owner from
//! [`Scheduler::take_due`]. Every entry carries a [`TimerHandle`]; owners keep
//! the handle of the entry they are waiting for and ignore any firing whose
//! handle they no longer hold, which makes late or cancelled callbacks no-ops.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::enums::LodLevel;

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Deferred work understood by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    RenderFrame,
    ZoomStep,
    LodTransition(LodLevel),
}

#[derive(Debug, Clone, Copy)]
enum Due {
    NextFrame,
    At(Instant),
}

#[derive(Debug)]
struct Entry {
    handle: TimerHandle,
    due: Due,
    task: Task,
}

pub struct Scheduler {
    clock: Box<dyn Clock>,
    next_id: u64,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Queue `task` for the next frame tick.
    pub fn schedule_frame(&mut self, task: Task) -> TimerHandle {
        self.push(Due::NextFrame, task)
    }

    /// Queue `task` to fire once `delay` has elapsed.
    pub fn schedule_after(&mut self, delay: Duration, task: Task) -> TimerHandle {
        let at = self.now() + delay;
        self.push(Due::At(at), task)
    }

    fn push(&mut self, due: Due, task: Task) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { handle, due, task });
        handle
    }

    /// Returns `false` if the entry already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return everything due on this tick, in scheduling order.
    /// Work queued while the result is being dispatched waits for a later tick.
    pub fn take_due(&mut self) -> Vec<(TimerHandle, Task)> {
        let now = self.now();
        let mut due = Vec::new();
        self.entries.retain(|entry| {
            let ready = match entry.due {
                Due::NextFrame => true,
                Due::At(at) => at <= now,
            };
            if ready {
                due.push((entry.handle, entry.task));
            }
            !ready
        });
        due
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_tasks_fire_on_next_tick() {
        let mut scheduler = Scheduler::new(ManualClock::new());
        let handle = scheduler.schedule_frame(Task::RenderFrame);
        assert!(scheduler.is_pending(handle));
        assert_eq!(scheduler.take_due(), vec![(handle, Task::RenderFrame)]);
        assert!(scheduler.take_due().is_empty());
    }

    #[test]
    fn timers_wait_for_their_deadline() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let handle = scheduler.schedule_after(
            Duration::from_millis(100),
            Task::LodTransition(LodLevel::Normal),
        );

        clock.advance(Duration::from_millis(99));
        assert!(scheduler.take_due().is_empty());
        clock.advance(Duration::from_millis(1));
        assert_eq!(
            scheduler.take_due(),
            vec![(handle, Task::LodTransition(LodLevel::Normal))]
        );
    }

    #[test]
    fn cancelled_entries_never_fire() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let handle = scheduler.schedule_after(Duration::from_millis(10), Task::ZoomStep);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));

        clock.advance(Duration::from_secs(1));
        assert!(scheduler.take_due().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn handles_are_unique() {
        let mut scheduler = Scheduler::new(ManualClock::new());
        let a = scheduler.schedule_frame(Task::ZoomStep);
        let b = scheduler.schedule_frame(Task::ZoomStep);
        assert_ne!(a, b);
    }
}
