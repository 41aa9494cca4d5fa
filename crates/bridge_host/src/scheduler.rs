//! One-shot timer scheduling.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    time::Duration,
};

/// Schedules deferred one-shot work on the page's event loop.
pub trait Scheduler {
    /// Runs `task` once after `delay` unless the returned handle is dropped first.
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ScheduledTask;
}

/// Handle to a scheduled task. Dropping it cancels the task if it has not run yet.
pub struct ScheduledTask {
    _guard: Option<Box<dyn Any>>,
}

impl ScheduledTask {
    /// Wraps a platform guard whose `Drop` cancels the underlying timer.
    pub fn new<G: 'static>(guard: G) -> Self {
        Self {
            _guard: Some(Box::new(guard)),
        }
    }

    /// Handle for schedulers that cannot cancel (the task simply never runs).
    pub fn detached() -> Self {
        Self { _guard: None }
    }

    /// Cancels the task. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask").finish_non_exhaustive()
    }
}

struct CancelOnDrop {
    cancelled: Rc<Cell<bool>>,
    clock: Weak<RefCell<ManualClock>>,
    seq: u64,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.cancelled.set(true);
        // Release the task's captures now; if the clock is busy the flag is enough.
        let Some(clock) = self.clock.upgrade() else {
            return;
        };
        let removed = match clock.try_borrow_mut() {
            Ok(mut state) => {
                let index = state.tasks.iter().position(|t| t.seq == self.seq);
                index.map(|i| state.tasks.remove(i))
            }
            Err(_) => None,
        };
        drop(removed);
    }
}

struct ManualTask {
    due: Duration,
    seq: u64,
    cancelled: Rc<Cell<bool>>,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_seq: u64,
    tasks: Vec<ManualTask>,
}

/// Virtual-time scheduler driven explicitly with [`ManualScheduler::advance`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of tasks still waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .iter()
            .filter(|t| !t.cancelled.get())
            .count()
    }

    /// Moves virtual time forward, running due tasks in deadline order. Returns how many ran.
    ///
    /// Tasks may schedule further work; anything falling inside the window runs too.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.inner.borrow().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut clock = self.inner.borrow_mut();
                clock.tasks.retain(|t| !t.cancelled.get());
                let index = clock
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                index.map(|i| {
                    let task = clock.tasks.remove(i);
                    clock.now = task.due;
                    task
                })
            };
            let Some(task) = next else {
                break;
            };
            task.cancelled.set(true);
            (task.task)();
            ran += 1;
        }
        self.inner.borrow_mut().now = target;
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ScheduledTask {
        let cancelled = Rc::new(Cell::new(false));
        let mut clock = self.inner.borrow_mut();
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let due = clock.now + delay;
        clock.tasks.push(ManualTask {
            due,
            seq,
            cancelled: cancelled.clone(),
            task,
        });
        drop(clock);
        ScheduledTask::new(CancelOnDrop {
            cancelled,
            clock: Rc::downgrade(&self.inner),
            seq,
        })
    }
}
