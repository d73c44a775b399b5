//! Calendar ports: event creation and meeting links derived from events.
//!
//! One `CalendarService` serves both parties: the seller and buyer calendar
//! tasks call it with their own `AccountRef`. The returned event id is the
//! task's detail and is what `MeetingLinkProvider` later attaches a link to.

use async_trait::async_trait;

use crate::domain::{AccountRef, Appointment, TaskError};

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create an event in `account`'s calendar and return its external id.
    ///
    /// Failures are classified as `Auth`, `RateLimit` or `Transient`.
    async fn create_event(
        &self,
        account: &AccountRef,
        appointment: &Appointment,
    ) -> Result<String, TaskError>;
}

/// Creates or fetches a conference link for a calendar event.
///
/// Called at most once per task set, with the seller's event when that
/// calendar task succeeded and the buyer's otherwise. The returned URL is
/// written back onto the appointment.
#[async_trait]
pub trait MeetingLinkProvider: Send + Sync {
    /// Attach (or look up) a video conference link for an existing event.
    async fn link_for_event(
        &self,
        account: &AccountRef,
        event_id: &str,
    ) -> Result<String, TaskError>;
}
