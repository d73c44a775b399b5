//! AvailabilityStore port: the seller's bookable time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::AccountRef;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("requested window overlaps an existing reservation")]
    Conflict,

    #[error("availability store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Atomically check that the window is free and hold it for the seller.
    async fn check_and_reserve(
        &self,
        seller: &AccountRef,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AvailabilityError>;

    /// Give a held window back. Unknown windows are ignored.
    async fn release(&self, seller: &AccountRef, start: DateTime<Utc>, end: DateTime<Utc>);
}
