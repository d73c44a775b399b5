use std::sync::Arc;

use async_trait::async_trait;

use super::{BackgroundTask, TaskContext};
use crate::domain::{AccountRef, TaskKind, TaskOutcome};
use crate::ports::CalendarService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Seller,
    Buyer,
}

/// Creates the appointment in one party's calendar. No dependencies.
pub struct CalendarTask {
    party: Party,
    calendar: Arc<dyn CalendarService>,
}

impl CalendarTask {
    pub fn seller(calendar: Arc<dyn CalendarService>) -> Self {
        Self {
            party: Party::Seller,
            calendar,
        }
    }

    pub fn buyer(calendar: Arc<dyn CalendarService>) -> Self {
        Self {
            party: Party::Buyer,
            calendar,
        }
    }

    fn account<'a>(&self, ctx: &'a TaskContext) -> &'a AccountRef {
        match self.party {
            Party::Seller => &ctx.appointment().seller_id,
            Party::Buyer => &ctx.appointment().buyer_id,
        }
    }
}

#[async_trait]
impl BackgroundTask for CalendarTask {
    fn kind(&self) -> TaskKind {
        match self.party {
            Party::Seller => TaskKind::SellerCalendar,
            Party::Buyer => TaskKind::BuyerCalendar,
        }
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
        let account = self.account(ctx);
        ctx.call(
            "calendar event creation",
            self.calendar.create_event(account, ctx.appointment()),
        )
        .await
        .into()
    }
}
