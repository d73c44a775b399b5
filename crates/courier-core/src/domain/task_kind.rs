//! The closed set of post-booking tasks and their declared dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One background side-effect of a committed booking.
///
/// The variant order is also a valid execution order; `TaskGraph` checks
/// that the declared dependencies agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "sellerCalendar")]
    SellerCalendar,
    #[serde(rename = "buyerCalendar")]
    BuyerCalendar,
    #[serde(rename = "meetLink")]
    MeetingLink,
    #[serde(rename = "email")]
    Email,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::SellerCalendar,
        TaskKind::BuyerCalendar,
        TaskKind::MeetingLink,
        TaskKind::Email,
    ];

    /// Tasks that must reach a terminal state (success or failure) before
    /// this one may start.
    pub fn dependencies(self) -> &'static [TaskKind] {
        match self {
            TaskKind::SellerCalendar | TaskKind::BuyerCalendar => &[],
            TaskKind::MeetingLink => &[TaskKind::SellerCalendar, TaskKind::BuyerCalendar],
            TaskKind::Email => &[TaskKind::MeetingLink],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::SellerCalendar => "sellerCalendar",
            TaskKind::BuyerCalendar => "buyerCalendar",
            TaskKind::MeetingLink => "meetLink",
            TaskKind::Email => "email",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
