//! MailSender port: outbound delivery of the confirmation email.
//!
//! The email task calls this exactly once per attempt, after the body has
//! been composed (by the AI composer or the fallback template). Nothing in
//! the core reads mail back, so the port is fire-and-report only.

use async_trait::async_trait;

use crate::domain::{AccountRef, TaskError};

/// Hands a finished message to a mail transport.
///
/// # Contract
/// - `Ok(())` means the transport accepted the message, not that it reached
///   the inbox. Bounces that arrive later are out of scope.
/// - An empty or malformed recipient is a `Delivery` error, never a panic.
/// - The call is bounded by the task's per-call timeout; an implementation
///   does not need its own.
///
/// # Errors
/// Transport rejections are `Delivery`. Throttling may be reported as
/// `RateLimit` so that a retry policy can pick it up.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, recipient: &AccountRef, subject: &str, body: &str)
    -> Result<(), TaskError>;
}
