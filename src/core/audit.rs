//! Dispatch log: an in-memory record of task routing decisions.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::util::clock::now_ms;

/// What happened to a task attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// The attempt was handed to a worker.
    Dispatched,
    /// The worker returned a payload.
    Completed,
    /// The worker call failed.
    Failed,
    /// The attempt exceeded its deadline.
    TimedOut,
    /// A failed first attempt is being retried on the next candidate.
    Fallback,
}

/// One recorded routing event.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    /// Task the event belongs to.
    pub task_id: Uuid,
    /// Worker involved in the attempt.
    pub worker_id: String,
    /// What happened.
    pub action: DispatchAction,
    /// Optional context (failure reason, fallback target).
    pub detail: Option<String>,
    /// Timestamp, milliseconds since epoch.
    pub created_at_ms: u128,
}

impl DispatchEvent {
    /// Build an event stamped with the current time.
    pub fn new(
        task_id: Uuid,
        worker_id: impl Into<String>,
        action: DispatchAction,
        detail: Option<String>,
    ) -> Self {
        Self {
            task_id,
            worker_id: worker_id.into(),
            action,
            detail,
            created_at_ms: now_ms(),
        }
    }
}

/// Sink abstraction for dispatch events.
pub trait DispatchSink: Send {
    /// Record one event.
    fn record(&mut self, event: DispatchEvent);
}

/// Bounded in-memory dispatch log; oldest events are evicted first.
pub struct InMemoryDispatchLog {
    events: VecDeque<DispatchEvent>,
    max_events: usize,
}

impl InMemoryDispatchLog {
    /// Create a log retaining at most `max_events` entries.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Snapshot of the retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.iter().cloned().collect()
    }
}

impl DispatchSink for InMemoryDispatchLog {
    fn record(&mut self, event: DispatchEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}
