//! Terminal result of a background task.

use serde::{Deserialize, Serialize};

use super::errors::{ErrorKind, TaskError};
use super::state::TaskState;

/// What a task produced once it stopped running.
///
/// `Succeeded` may still be degraded: the email task, for instance, succeeds
/// with a note when it had to fall back to the static template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded {
        /// External identifier: calendar event id, meeting link, message id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Failed(TaskError),
}

impl TaskOutcome {
    pub fn success(reference: impl Into<String>) -> Self {
        TaskOutcome::Succeeded {
            reference: Some(reference.into()),
            note: None,
        }
    }

    pub fn degraded(reference: impl Into<String>, note: impl Into<String>) -> Self {
        TaskOutcome::Succeeded {
            reference: Some(reference.into()),
            note: Some(note.into()),
        }
    }

    pub fn failure(error: TaskError) -> Self {
        TaskOutcome::Failed(error)
    }

    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Succeeded { .. } => TaskState::Succeeded,
            TaskOutcome::Failed(_) => TaskState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            TaskOutcome::Succeeded { reference, .. } => reference.as_deref(),
            TaskOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            TaskOutcome::Failed(err) => Some(err),
            TaskOutcome::Succeeded { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind)
    }

    /// Human-readable one-liner for diagnostics.
    pub fn detail(&self) -> Option<String> {
        match self {
            TaskOutcome::Succeeded {
                reference,
                note: Some(note),
            } => Some(match reference {
                Some(r) => format!("{r} ({note})"),
                None => note.clone(),
            }),
            TaskOutcome::Succeeded {
                reference,
                note: None,
            } => reference.clone(),
            TaskOutcome::Failed(err) => Some(err.to_string()),
        }
    }
}

impl From<Result<String, TaskError>> for TaskOutcome {
    fn from(result: Result<String, TaskError>) -> Self {
        match result {
            Ok(reference) => TaskOutcome::success(reference),
            Err(err) => TaskOutcome::failure(err),
        }
    }
}
