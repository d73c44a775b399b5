//! Per-task record and the per-appointment task set.
//!
//! A `TaskSet` is created Pending for every `TaskKind` when an appointment is
//! dispatched, and lives in the status store until retention evicts it.
//!
//! # Write rules
//! - A record moves forward only: Pending, then Running, then a terminal state.
//!   Pending may also jump straight to Failed when the set is interrupted
//!   before the task starts.
//! - A terminal state is written once. A second terminal write is rejected
//!   with `TransitionError::AlreadyTerminal` and the stored record is left as
//!   it was.
//! - Every accepted write refreshes `last_activity`, which retention counts
//!   from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::ids::AppointmentId;
use super::outcome::TaskOutcome;
use super::state::TaskState;
use super::task_kind::TaskKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{task} already finished as {state:?}")]
    AlreadyTerminal { task: TaskKind, state: TaskState },

    #[error("{task} cannot move from {from:?} to {to:?}")]
    Invalid {
        task: TaskKind,
        from: TaskState,
        to: TaskState,
    },
}

/// State of one task. All mutation goes through `start` / `finish` so the
/// monotonic, terminal-once rule lives in a single place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub kind: TaskKind,
    pub appointment_id: AppointmentId,
    pub state: TaskState,
    pub outcome: Option<TaskOutcome>,
    /// Executions performed so far. Stays at 1 unless a retry policy allows more.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(kind: TaskKind, appointment_id: AppointmentId, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            appointment_id,
            state: TaskState::Pending,
            outcome: None,
            attempts: 0,
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check(TaskState::Running)?;
        self.state = TaskState::Running;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn finish(
        &mut self,
        outcome: TaskOutcome,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.check(outcome.state())?;
        self.state = outcome.state();
        self.outcome = Some(outcome);
        self.attempts = attempts;
        self.finished_at = Some(now);
        Ok(())
    }

    fn check(&self, to: TaskState) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                task: self.kind,
                state: self.state,
            });
        }
        if !self.state.can_transition_to(to) {
            return Err(TransitionError::Invalid {
                task: self.kind,
                from: self.state,
                to,
            });
        }
        Ok(())
    }
}

/// All tasks belonging to one appointment.
///
/// `is_finished` is true once every record is terminal; `is_degraded` once
/// at least one of them failed.
#[derive(Debug, Clone)]
pub struct TaskSet {
    pub appointment_id: AppointmentId,
    pub tasks: BTreeMap<TaskKind, TaskRecord>,
    pub created_at: DateTime<Utc>,
    /// Monotonic time of the last write; drives retention.
    pub last_activity: Instant,
}

impl TaskSet {
    pub fn new(appointment_id: AppointmentId, now: DateTime<Utc>) -> Self {
        let tasks = TaskKind::ALL
            .iter()
            .map(|&kind| (kind, TaskRecord::new(kind, appointment_id, now)))
            .collect();
        Self {
            appointment_id,
            tasks,
            created_at: now,
            last_activity: Instant::now(),
        }
    }

    pub fn get(&self, kind: TaskKind) -> Option<&TaskRecord> {
        self.tasks.get(&kind)
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.values().all(|t| t.state.is_terminal())
    }

    /// True when the booking completed with at least one failed task.
    pub fn is_degraded(&self) -> bool {
        self.tasks.values().any(|t| t.state == TaskState::Failed)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
