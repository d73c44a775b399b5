//! Background task contract and the four post-booking tasks.
//!
//! Every task implements one capability: run against a `TaskContext` and
//! produce a terminal `TaskOutcome`. Errors never escape a task; they are
//! turned into `TaskOutcome::Failed` with a classification.

pub mod calendar;
pub mod email;
pub mod meeting_link;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Appointment, TaskError, TaskKind, TaskOutcome};

pub use self::calendar::CalendarTask;
pub use self::email::{EmailTask, fallback_body};
pub use self::meeting_link::MeetingLinkTask;

#[async_trait]
pub trait BackgroundTask: Send + Sync {
    fn kind(&self) -> TaskKind;

    async fn execute(&self, ctx: &TaskContext) -> TaskOutcome;
}

/// Everything a task may look at while running.
pub struct TaskContext {
    appointment: Arc<Appointment>,
    upstream: BTreeMap<TaskKind, TaskOutcome>,
    call_timeout: Duration,
}

impl TaskContext {
    pub fn new(
        appointment: Arc<Appointment>,
        upstream: BTreeMap<TaskKind, TaskOutcome>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            appointment,
            upstream,
            call_timeout,
        }
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    /// Terminal outcome of a dependency. Only declared dependencies are present.
    pub fn upstream(&self, kind: TaskKind) -> Option<&TaskOutcome> {
        self.upstream.get(&kind)
    }

    /// Run one external call under the per-call timeout.
    pub async fn call<T, F>(&self, what: &str, fut: F) -> Result<T, TaskError>
    where
        F: Future<Output = Result<T, TaskError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TaskError::timeout(format!(
                "{what} did not answer within {}ms",
                self.call_timeout.as_millis()
            ))),
        }
    }
}
