//! Read-only view over the status store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::status_store::{StatusStore, StoreSummary};
use crate::domain::{AppointmentId, ErrorKind, TaskKind, TaskRecord, TaskState};

/// Status of one task as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub status: TaskState,
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub attempts: u32,
}

impl From<&TaskRecord> for TaskStatus {
    fn from(record: &TaskRecord) -> Self {
        Self {
            status: record.state,
            detail: record.outcome.as_ref().and_then(|o| o.detail()),
            error_kind: record.outcome.as_ref().and_then(|o| o.error_kind()),
            attempts: record.attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusReport {
    pub appointment_id: AppointmentId,
    pub tasks: BTreeMap<TaskKind, TaskStatus>,
    /// Every task reached a terminal state.
    pub finished: bool,
    /// At least one task failed.
    pub degraded: bool,
}

impl TaskStatusReport {
    pub fn status_of(&self, kind: TaskKind) -> Option<TaskState> {
        self.tasks.get(&kind).map(|t| t.status)
    }
}

/// Query interface for tests and operational tooling. Never mutates state,
/// never re-triggers a side effect.
#[derive(Clone)]
pub struct Diagnostics {
    store: Arc<StatusStore>,
}

impl Diagnostics {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }

    /// `None` when the appointment was never dispatched or its task set has
    /// passed the retention window.
    pub fn get_task_statuses(&self, appointment_id: AppointmentId) -> Option<TaskStatusReport> {
        let set = self.store.get(appointment_id)?;
        Some(TaskStatusReport {
            appointment_id,
            tasks: set
                .tasks
                .iter()
                .map(|(&kind, record)| (kind, TaskStatus::from(record)))
                .collect(),
            finished: set.is_finished(),
            degraded: set.is_degraded(),
        })
    }

    pub fn summary(&self) -> StoreSummary {
        self.store.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::status_store::TaskUpdate;
    use crate::domain::{TaskError, TaskOutcome};
    use crate::ports::SystemClock;
    use std::time::Duration;
    use ulid::Ulid;

    fn setup() -> (Arc<StatusStore>, Diagnostics, AppointmentId) {
        let store = Arc::new(StatusStore::new(
            Duration::from_secs(60),
            Arc::new(SystemClock),
        ));
        let id = AppointmentId::from_ulid(Ulid::new());
        store.register(id).unwrap();
        (store.clone(), Diagnostics::new(store), id)
    }

    #[test]
    fn reports_every_task() {
        let (store, diagnostics, id) = setup();
        store
            .update(id, TaskKind::SellerCalendar, TaskUpdate::Running)
            .unwrap();
        store
            .update(
                id,
                TaskKind::SellerCalendar,
                TaskUpdate::Finished {
                    outcome: TaskOutcome::success("evt-9"),
                    attempts: 1,
                },
            )
            .unwrap();
        store
            .update(id, TaskKind::BuyerCalendar, TaskUpdate::Running)
            .unwrap();
        store
            .update(
                id,
                TaskKind::BuyerCalendar,
                TaskUpdate::Finished {
                    outcome: TaskOutcome::failure(TaskError::rate_limit("429 from provider")),
                    attempts: 1,
                },
            )
            .unwrap();

        let report = diagnostics.get_task_statuses(id).unwrap();

        assert_eq!(report.tasks.len(), 4);
        let seller = &report.tasks[&TaskKind::SellerCalendar];
        assert_eq!(seller.status, TaskState::Succeeded);
        assert_eq!(seller.detail.as_deref(), Some("evt-9"));
        let buyer = &report.tasks[&TaskKind::BuyerCalendar];
        assert_eq!(buyer.status, TaskState::Failed);
        assert_eq!(buyer.error_kind, Some(ErrorKind::RateLimit));
        assert_eq!(buyer.detail.as_deref(), Some("rate_limit: 429 from provider"));
        assert_eq!(report.status_of(TaskKind::Email), Some(TaskState::Pending));
        assert!(report.degraded);
        assert!(!report.finished);
    }

    #[test]
    fn unknown_appointment_is_not_found() {
        let (_store, diagnostics, _id) = setup();
        assert!(
            diagnostics
                .get_task_statuses(AppointmentId::from_ulid(Ulid::new()))
                .is_none()
        );
    }

    #[test]
    fn reading_does_not_touch_state() {
        let (store, diagnostics, id) = setup();
        let before = store.get(id).unwrap();

        diagnostics.get_task_statuses(id);
        diagnostics.summary();

        let after = store.get(id).unwrap();
        assert_eq!(before.last_activity, after.last_activity);
        assert_eq!(before.tasks, after.tasks);
    }

    #[test]
    fn serializes_with_wire_names() {
        let (_store, diagnostics, id) = setup();
        let json = serde_json::to_value(diagnostics.get_task_statuses(id).unwrap()).unwrap();

        let tasks = json["tasks"].as_object().unwrap();
        let mut keys: Vec<&str> = tasks.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["buyerCalendar", "email", "meetLink", "sellerCalendar"]);
        assert_eq!(json["tasks"]["email"]["status"], "pending");
        assert_eq!(json["appointmentId"], id.to_string());
    }
}
