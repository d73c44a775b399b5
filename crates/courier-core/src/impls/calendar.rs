//! Local stand-ins for the calendar provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{AccountRef, Appointment, TaskError};
use crate::ports::{CalendarService, MeetingLinkProvider};

/// Creates numbered events after an optional delay. Accounts can be set up
/// to fail with a fixed error.
#[derive(Default)]
pub struct SimulatedCalendar {
    latency: Duration,
    failures: HashMap<AccountRef, TaskError>,
    next_event: AtomicU64,
}

impl SimulatedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_for(mut self, account: AccountRef, error: TaskError) -> Self {
        self.failures.insert(account, error);
        self
    }
}

#[async_trait]
impl CalendarService for SimulatedCalendar {
    async fn create_event(
        &self,
        account: &AccountRef,
        appointment: &Appointment,
    ) -> Result<String, TaskError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(err) = self.failures.get(account) {
            return Err(err.clone());
        }
        let n = self.next_event.fetch_add(1, Ordering::Relaxed) + 1;
        let event_id = format!("evt-{n:06}");
        debug!(%account, appointment_id = %appointment.id, %event_id, "calendar event created");
        Ok(event_id)
    }
}

/// Derives a stable conference URL from the event id.
pub struct DerivedMeetingLinks {
    base_url: String,
}

impl DerivedMeetingLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for DerivedMeetingLinks {
    fn default() -> Self {
        Self::new("https://meet.example.com")
    }
}

#[async_trait]
impl MeetingLinkProvider for DerivedMeetingLinks {
    async fn link_for_event(
        &self,
        _account: &AccountRef,
        event_id: &str,
    ) -> Result<String, TaskError> {
        if event_id.is_empty() {
            return Err(TaskError::transient("event id is empty"));
        }
        Ok(format!("{}/{event_id}", self.base_url))
    }
}
