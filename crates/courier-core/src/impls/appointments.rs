//! InMemoryAppointments: the appointment table, held in a concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{Appointment, AppointmentId};
use crate::ports::{PersistenceError, PersistenceStore};

#[derive(Default)]
pub struct InMemoryAppointments {
    rows: DashMap<AppointmentId, Appointment>,
}

impl InMemoryAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryAppointments {
    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), PersistenceError> {
        self.rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, PersistenceError> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn set_meeting_link(&self, id: AppointmentId, link: &str) -> Result<(), PersistenceError> {
        let mut row = self
            .rows
            .get_mut(&id)
            .ok_or(PersistenceError::NotFound(id))?;
        row.meeting_link = Some(link.to_string());
        Ok(())
    }
}
