//! Error taxonomy.
//!
//! Two families that never mix:
//! - `BookingError`: returned synchronously to whoever asked for the booking.
//! - `TaskError`: local to one background task, recorded in the status store
//!   and never surfaced to the booking caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a background task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Calendar or mail account rejected our credentials.
    Auth,
    RateLimit,
    Transient,
    /// AI composition failed. The email task absorbs this with a template.
    Generation,
    Delivery,
    Timeout,
    /// Every upstream task this one needed ended in failure.
    DependencyFailed,
    /// Orchestrator shut down before the task finished.
    Cancelled,
    Panicked,
}

impl ErrorKind {
    /// Whether another attempt has a reasonable chance of succeeding.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::Transient | ErrorKind::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Transient => "transient",
            ErrorKind::Generation => "generation",
            ErrorKind::Delivery => "delivery",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DependencyFailed => "dependency_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Panicked => "panicked",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single background task or of one collaborator call inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generation, message)
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Delivery, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}

/// Synchronous failure of the commit gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("seller {seller} is not available between {start} and {end}")]
    Conflict {
        seller: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("failed to persist appointment: {0}")]
    Persistence(String),
}

impl BookingError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Short machine-readable code for client responses.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation { .. } => "validation_error",
            BookingError::Conflict { .. } => "conflict",
            BookingError::Persistence(_) => "persistence_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::RateLimit, true)]
    #[case(ErrorKind::Transient, true)]
    #[case(ErrorKind::Timeout, true)]
    #[case(ErrorKind::Auth, false)]
    #[case(ErrorKind::Generation, false)]
    #[case(ErrorKind::Delivery, false)]
    #[case(ErrorKind::DependencyFailed, false)]
    #[case(ErrorKind::Cancelled, false)]
    fn retryable_kinds(#[case] kind: ErrorKind, #[case] retryable: bool) {
        assert_eq!(kind.is_retryable(), retryable);
    }

    #[test]
    fn task_error_display_leads_with_kind() {
        let err = TaskError::rate_limit("429 from calendar");
        assert_eq!(err.to_string(), "rate_limit: 429 from calendar");
    }

    #[test]
    fn kind_serializes_like_display() {
        let json = serde_json::to_string(&ErrorKind::DependencyFailed).unwrap();
        assert_eq!(json, "\"dependency_failed\"");
    }

    #[test]
    fn booking_error_codes() {
        assert_eq!(BookingError::validation("timezone", "empty").code(), "validation_error");
        assert_eq!(BookingError::Persistence("disk".into()).code(), "persistence_error");
    }
}
