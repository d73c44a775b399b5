use std::sync::Arc;

use async_trait::async_trait;

use super::{BackgroundTask, TaskContext};
use crate::domain::{AccountRef, ErrorKind, TaskError, TaskKind, TaskOutcome};
use crate::ports::{MeetingLinkProvider, PersistenceStore};

/// Derives a conference link from whichever calendar event exists and writes
/// it back to the appointment.
///
/// Runs after both calendar tasks are terminal. The seller's event is
/// preferred; if both calendar tasks failed there is nothing to attach a link
/// to and the task fails as `DependencyFailed` with no link.
pub struct MeetingLinkTask {
    links: Arc<dyn MeetingLinkProvider>,
    appointments: Arc<dyn PersistenceStore>,
}

impl MeetingLinkTask {
    pub fn new(
        links: Arc<dyn MeetingLinkProvider>,
        appointments: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self {
            links,
            appointments,
        }
    }

    fn source_event<'a>(&self, ctx: &'a TaskContext) -> Option<(&'a AccountRef, &'a str)> {
        let apt = ctx.appointment();
        [
            (TaskKind::SellerCalendar, &apt.seller_id),
            (TaskKind::BuyerCalendar, &apt.buyer_id),
        ]
        .into_iter()
        .find_map(|(kind, account)| {
            ctx.upstream(kind)
                .and_then(|o| o.reference())
                .map(|event_id| (account, event_id))
        })
    }
}

#[async_trait]
impl BackgroundTask for MeetingLinkTask {
    fn kind(&self) -> TaskKind {
        TaskKind::MeetingLink
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
        let Some((account, event_id)) = self.source_event(ctx) else {
            return TaskOutcome::failure(TaskError::new(
                ErrorKind::DependencyFailed,
                "no calendar event to attach a meeting link to",
            ));
        };

        let link = match ctx
            .call("meeting link", self.links.link_for_event(account, event_id))
            .await
        {
            Ok(link) => link,
            Err(err) => return TaskOutcome::failure(err),
        };

        let id = ctx.appointment().id;
        let write_back = ctx
            .call("meeting link write-back", async {
                self.appointments
                    .set_meeting_link(id, &link)
                    .await
                    .map_err(|e| TaskError::transient(e.to_string()))
            })
            .await;

        match write_back {
            Ok(()) => TaskOutcome::success(link),
            Err(err) => TaskOutcome::failure(err),
        }
    }
}
