//! PersistenceStore port: the appointment's system of record.
//!
//! # Contract
//! - `save_appointment` is on the request path. When it returns `Ok`, the
//!   booking is confirmed and background work is dispatched.
//! - After that, the only write is `set_meeting_link`, made by the
//!   meeting-link task.
//! - The commit gate bounds every call with its own timeout.

use async_trait::async_trait;

use crate::domain::{Appointment, AppointmentId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("appointment {0} not found")]
    NotFound(AppointmentId),

    #[error("storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), PersistenceError>;

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, PersistenceError>;

    /// The only field that may change after commit.
    async fn set_meeting_link(
        &self,
        id: AppointmentId,
        link: &str,
    ) -> Result<(), PersistenceError>;
}
