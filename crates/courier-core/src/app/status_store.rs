//! Status store: the authoritative, queryable state of every task set.
//!
//! Design:
//! - One `TaskSet` per appointment, created by `register`.
//! - Concurrent tasks of one appointment write disjoint keys, so contention is
//!   limited to the map's shard locks. No lock is held across an `.await`.
//! - Entries idle for longer than the retention window are invisible to
//!   readers and purged by `evict_expired` (driven by the sweeper).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{
    AppointmentId, TaskError, TaskKind, TaskOutcome, TaskSet, TaskState, TransitionError,
};
use crate::ports::Clock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no task set for appointment {0}")]
    NotFound(AppointmentId),

    #[error("task set for appointment {0} is already registered")]
    AlreadyRegistered(AppointmentId),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// A single write against one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Running,
    Finished { outcome: TaskOutcome, attempts: u32 },
}

/// Aggregate counts for operational views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub task_sets: usize,
    pub finished_sets: usize,
    pub degraded_sets: usize,
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct StatusStore {
    sets: DashMap<AppointmentId, TaskSet>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl StatusStore {
    pub fn new(retention: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sets: DashMap::new(),
            retention,
            clock,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn is_expired(&self, set: &TaskSet, now: Instant) -> bool {
        now.saturating_duration_since(set.last_activity) >= self.retention
    }

    /// Create the task set for an appointment, all tasks Pending.
    ///
    /// A live set for the same appointment is an error; an expired one is
    /// replaced.
    pub fn register(&self, appointment_id: AppointmentId) -> Result<(), StoreError> {
        let now = Instant::now();
        match self.sets.entry(appointment_id) {
            Entry::Occupied(mut e) => {
                if !self.is_expired(e.get(), now) {
                    return Err(StoreError::AlreadyRegistered(appointment_id));
                }
                e.insert(TaskSet::new(appointment_id, self.clock.now()));
            }
            Entry::Vacant(e) => {
                e.insert(TaskSet::new(appointment_id, self.clock.now()));
            }
        }
        Ok(())
    }

    /// Snapshot of a task set, or `None` if never registered or expired.
    pub fn get(&self, appointment_id: AppointmentId) -> Option<TaskSet> {
        let now = Instant::now();
        self.sets
            .get(&appointment_id)
            .filter(|set| !self.is_expired(set, now))
            .map(|set| set.value().clone())
    }

    /// Apply one transition. Running is written once, then exactly one
    /// terminal write; anything else is rejected and leaves the record as is.
    pub fn update(
        &self,
        appointment_id: AppointmentId,
        kind: TaskKind,
        update: TaskUpdate,
    ) -> Result<TaskState, StoreError> {
        let mut set = self
            .sets
            .get_mut(&appointment_id)
            .ok_or(StoreError::NotFound(appointment_id))?;
        let now = self.clock.now();

        let record = set
            .tasks
            .get_mut(&kind)
            .ok_or(StoreError::NotFound(appointment_id))?;
        match update {
            TaskUpdate::Running => record.start(now)?,
            TaskUpdate::Finished { outcome, attempts } => record.finish(outcome, attempts, now)?,
        }
        let state = record.state;
        set.touch();

        debug!(%appointment_id, task = %kind, ?state, "task state updated");
        Ok(state)
    }

    /// Fail every task of the set that has not reached a terminal state.
    /// Returns the kinds that were failed.
    pub fn fail_unfinished(&self, appointment_id: AppointmentId, error: &TaskError) -> Vec<TaskKind> {
        let Some(mut set) = self.sets.get_mut(&appointment_id) else {
            return Vec::new();
        };
        let now = self.clock.now();

        let mut failed = Vec::new();
        for record in set.tasks.values_mut() {
            if record.state.is_terminal() {
                continue;
            }
            let attempts = record.attempts.max(u32::from(record.state == TaskState::Running));
            if record
                .finish(TaskOutcome::failure(error.clone()), attempts, now)
                .is_ok()
            {
                failed.push(record.kind);
            }
        }
        if !failed.is_empty() {
            set.touch();
        }
        failed
    }

    /// Drop every set idle for longer than the retention window.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sets.len();
        self.sets.retain(|_, set| !self.is_expired(set, now));
        before.saturating_sub(self.sets.len())
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn summary(&self) -> StoreSummary {
        let now = Instant::now();
        let mut summary = StoreSummary::default();
        for entry in self.sets.iter() {
            let set = entry.value();
            if self.is_expired(set, now) {
                continue;
            }
            summary.task_sets += 1;
            if set.is_finished() {
                summary.finished_sets += 1;
            }
            if set.is_degraded() {
                summary.degraded_sets += 1;
            }
            for task in set.tasks.values() {
                match task.state {
                    TaskState::Pending => summary.pending += 1,
                    TaskState::Running => summary.running += 1,
                    TaskState::Succeeded => summary.succeeded += 1,
                    TaskState::Failed => summary.failed += 1,
                }
            }
        }
        summary
    }
}
