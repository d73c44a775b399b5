//! AiComposer port: drafts the confirmation message.
//!
//! Composition is the one step whose failure is absorbed rather than
//! reported. When `compose` errors or times out, the email task falls back
//! to `tasks::fallback_body` and still sends.

use async_trait::async_trait;

use crate::domain::{Appointment, TaskError};

/// Produces the body of the confirmation email.
///
/// `meeting_link` is `None` when the meeting-link task failed or was never
/// reached; the draft should then say the link follows separately.
///
/// # Errors
/// Model or provider failures are `Generation`.
#[async_trait]
pub trait AiComposer: Send + Sync {
    /// Draft a confirmation body.
    async fn compose(
        &self,
        appointment: &Appointment,
        meeting_link: Option<&str>,
    ) -> Result<String, TaskError>;
}
