//! Deferred callbacks for auto-dismiss.
//!
//! A scheduler only has to run a task once, some time after `delay`, and
//! never from inside `schedule` itself. There is no cancel: a task whose
//! target is already gone must be a no-op by construction.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};

/// A one-shot deferred callback.
pub type DismissTask = Box<dyn FnOnce() + Send + 'static>;

/// Timer facility the notification bus registers dismiss callbacks with.
pub trait DismissScheduler: Send + Sync + 'static {
    /// Register `task` to run once after `delay`. Fire-and-forget.
    fn schedule(&self, delay: Duration, task: DismissTask);
}

impl<S> DismissScheduler for Arc<S>
where
    S: DismissScheduler + ?Sized,
{
    fn schedule(&self, delay: Duration, task: DismissTask) {
        (**self).schedule(delay, task)
    }
}

/// Runs dismiss tasks on a tokio runtime after `tokio::time::sleep(delay)`.
///
/// Works with a paused test clock (`#[tokio::test(start_paused = true)]`).
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    pub fn try_current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl DismissScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: DismissTask) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

struct PendingTask {
    deadline: Duration,
    order: u64,
    task: DismissTask,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_order: u64,
    pending: Vec<PendingTask>,
}

/// Scheduler driven by an explicit virtual clock.
///
/// Nothing runs until [`ManualScheduler::advance`] moves the clock past a
/// task's deadline. Due tasks run in deadline order, ties in registration
/// order. Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.clock().now
    }

    /// Number of tasks still waiting for their deadline.
    pub fn pending(&self) -> usize {
        self.clock().pending.len()
    }

    /// Move the clock forward by `by`, running every task that falls due,
    /// including tasks scheduled by tasks run during this call. Returns how
    /// many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = {
            let mut clock = self.clock();
            clock.now += by;
            clock.now
        };

        let mut ran = 0;
        // Tasks run without the lock held so they may schedule more work.
        while let Some(task) = self.pop_due(target) {
            task();
            ran += 1;
        }
        ran
    }

    fn pop_due(&self, target: Duration) -> Option<DismissTask> {
        let mut clock = self.clock();
        let index = clock
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.deadline <= target)
            .min_by_key(|(_, p)| (p.deadline, p.order))
            .map(|(index, _)| index)?;
        Some(clock.pending.swap_remove(index).task)
    }

    fn clock(&self) -> MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DismissScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: DismissTask) {
        let mut clock = self.clock();
        let order = clock.next_order;
        clock.next_order += 1;
        let deadline = clock.now + delay;
        clock.pending.push(PendingTask {
            deadline,
            order,
            task,
        });
    }
}

impl core::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let clock = self.clock();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.pending.len())
            .finish()
    }
}
