use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{BackgroundTask, TaskContext};
use crate::domain::{Appointment, TaskKind, TaskOutcome};
use crate::ports::{AiComposer, MailSender};

/// Sends the buyer a confirmation message.
///
/// The body is drafted by the AI composer. When composition fails the static
/// template is used instead and the task still succeeds, with a note saying
/// so. Only a delivery failure fails the task.
pub struct EmailTask {
    composer: Arc<dyn AiComposer>,
    mailer: Arc<dyn MailSender>,
}

impl EmailTask {
    pub fn new(composer: Arc<dyn AiComposer>, mailer: Arc<dyn MailSender>) -> Self {
        Self { composer, mailer }
    }
}

pub fn subject(appointment: &Appointment) -> String {
    format!("Confirmed: {}", appointment.title)
}

/// Static confirmation body used when the composer is unavailable.
pub fn fallback_body(appointment: &Appointment, meeting_link: Option<&str>) -> String {
    let mut body = format!(
        "Hello,\n\nYour appointment \"{}\" with {} is confirmed.\n\nWhen: {} - {} ({})\nDuration: {} minutes\n",
        appointment.title,
        appointment.seller_id,
        appointment.start.format("%Y-%m-%d %H:%M UTC"),
        appointment.end.format("%H:%M UTC"),
        appointment.timezone,
        appointment.duration_minutes(),
    );
    match meeting_link {
        Some(link) => body.push_str(&format!("Join: {link}\n")),
        None => body.push_str("A meeting link will be shared separately.\n"),
    }
    body.push_str("\nSee you there.\n");
    body
}

#[async_trait]
impl BackgroundTask for EmailTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Email
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
        let appointment = ctx.appointment();
        let link = ctx
            .upstream(TaskKind::MeetingLink)
            .and_then(TaskOutcome::reference);

        let (body, fallback_reason) = match ctx
            .call("message composition", self.composer.compose(appointment, link))
            .await
        {
            Ok(body) => (body, None),
            Err(err) => {
                warn!(appointment_id = %appointment.id, error = %err, "composer failed; using fallback template");
                (fallback_body(appointment, link), Some(err))
            }
        };

        let recipient = &appointment.buyer_id;
        let sent = ctx
            .call(
                "mail delivery",
                self.mailer.send(recipient, &subject(appointment), &body),
            )
            .await;

        match (sent, fallback_reason) {
            (Err(err), _) => TaskOutcome::failure(err),
            (Ok(()), None) => TaskOutcome::success(recipient.to_string()),
            (Ok(()), Some(reason)) => TaskOutcome::degraded(
                recipient.to_string(),
                format!("sent with fallback template after {reason}"),
            ),
        }
    }
}
