//! Virtual-time timer queue with cooperative cancellation.
//!
//! # Responsibility
//! - Register one-shot and repeating tasks against a monotonic virtual clock.
//! - Hand due tasks back one at a time in `(due time, registration)` order.
//! - Tie every task to a `tokio_util` `CancellationToken` so teardown wins
//!   over due ticks. Only the token's synchronous calls are used, so no
//!   runtime is needed.
//!
//! # Invariants
//! - The clock never moves backwards.
//! - A task whose token is cancelled is never returned by `pop_due`, even if
//!   it was already due when the token was cancelled.
//! - Repeating tasks keep their registration order across reschedules.

pub use tokio_util::sync::CancellationToken;

/// Handle of one registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Entry<T> {
    handle: TaskHandle,
    due_ms: u64,
    period_ms: Option<u64>,
    token: CancellationToken,
    task: T,
}

/// Single-threaded timer queue driven by explicit `pop_due` calls.
#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_handle: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_handle: 0,
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Registers a task firing once, `delay_ms` from now.
    pub fn schedule_once(&mut self, delay_ms: u64, task: T, token: &CancellationToken) -> TaskHandle {
        self.push(delay_ms, None, task, token)
    }

    /// Registers a task firing every `period_ms`, first after one period.
    ///
    /// A zero period is treated as one millisecond.
    pub fn schedule_repeating(
        &mut self,
        period_ms: u64,
        task: T,
        token: &CancellationToken,
    ) -> TaskHandle {
        let period_ms = period_ms.max(1);
        self.push(period_ms, Some(period_ms), task, token)
    }

    fn push(
        &mut self,
        delay_ms: u64,
        period_ms: Option<u64>,
        task: T,
        token: &CancellationToken,
    ) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            due_ms: self.now_ms.saturating_add(delay_ms),
            period_ms,
            token: token.clone(),
            task,
        });
        handle
    }

    /// Removes one task. Unknown handles are ignored.
    pub fn cancel(&mut self, handle: TaskHandle) {
        self.entries.retain(|entry| entry.handle != handle);
    }

    /// Drops every task whose token is cancelled.
    pub fn purge_cancelled(&mut self) {
        self.entries.retain(|entry| !entry.token.is_cancelled());
    }

    /// Drops every task.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live (non-cancelled) tasks.
    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.token.is_cancelled())
            .count()
    }

    /// Due time of the earliest live task.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.entries
            .iter()
            .filter(|entry| !entry.token.is_cancelled())
            .map(|entry| entry.due_ms)
            .min()
    }

    /// Pops the earliest live task due at or before `until_ms`.
    ///
    /// Moves the clock to the task's due time. Repeating tasks are re-armed
    /// one period later before being returned.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<T> {
        self.purge_cancelled();

        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due_ms <= until_ms)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.handle.0))
            .map(|(index, _)| index)?;

        let due_ms = self.entries[index].due_ms;
        self.now_ms = self.now_ms.max(due_ms);

        match self.entries[index].period_ms {
            Some(period_ms) => {
                let entry = &mut self.entries[index];
                entry.due_ms = due_ms.saturating_add(period_ms);
                Some(entry.task.clone())
            }
            None => Some(self.entries.remove(index).task),
        }
    }

    /// Moves the clock forward without firing anything.
    pub fn advance_clock(&mut self, to_ms: u64) {
        self.now_ms = self.now_ms.max(to_ms);
    }
}
