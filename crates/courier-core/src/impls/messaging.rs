//! Local composer and mailer.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{AccountRef, Appointment, TaskError};
use crate::ports::{AiComposer, MailSender};
use crate::tasks::fallback_body;

/// Composer that renders a friendlier variant of the static template.
/// Can be switched off to exercise the fallback path.
#[derive(Default)]
pub struct TemplateComposer {
    unavailable: bool,
}

impl TemplateComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `compose` call fails with a `Generation` error.
    pub fn unavailable() -> Self {
        Self { unavailable: true }
    }
}

#[async_trait]
impl AiComposer for TemplateComposer {
    async fn compose(
        &self,
        appointment: &Appointment,
        meeting_link: Option<&str>,
    ) -> Result<String, TaskError> {
        if self.unavailable {
            return Err(TaskError::generation("composer is switched off"));
        }
        let greeting = format!(
            "Hi {},\n\nThanks for booking \"{}\". Here are the details.\n",
            appointment.buyer_id, appointment.title
        );
        Ok(greeting + &fallback_body(appointment, meeting_link))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipient: AccountRef,
    pub subject: String,
    pub body: String,
}

/// Mailer that logs each message and keeps a copy in memory.
#[derive(Default)]
pub struct LogMailer {
    outbox: Mutex<Vec<SentMail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, recipient: &AccountRef, subject: &str, body: &str) -> Result<(), TaskError> {
        if recipient.as_str().trim().is_empty() {
            return Err(TaskError::delivery("recipient address is empty"));
        }
        info!(%recipient, subject, bytes = body.len(), "mail sent");
        self.outbox.lock().await.push(SentMail {
            recipient: recipient.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
