//! InMemoryAvailability: per-seller reservations held in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::AccountRef;
use crate::ports::{AvailabilityError, AvailabilityStore};

type Window = (DateTime<Utc>, DateTime<Utc>);

/// Check and reserve happen under one lock, so two overlapping requests for
/// the same seller can never both succeed.
#[derive(Default)]
pub struct InMemoryAvailability {
    reserved: Mutex<HashMap<AccountRef, Vec<Window>>>,
}

impl InMemoryAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reservations(&self, seller: &AccountRef) -> usize {
        self.reserved
            .lock()
            .await
            .get(seller)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailability {
    async fn check_and_reserve(
        &self,
        seller: &AccountRef,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AvailabilityError> {
        let mut reserved = self.reserved.lock().await;
        let windows = reserved.entry(seller.clone()).or_default();
        // half-open: back-to-back slots are fine
        if windows.iter().any(|&(s, e)| s < end && start < e) {
            return Err(AvailabilityError::Conflict);
        }
        windows.push((start, end));
        Ok(())
    }

    async fn release(&self, seller: &AccountRef, start: DateTime<Utc>, end: DateTime<Utc>) {
        let mut reserved = self.reserved.lock().await;
        if let Some(windows) = reserved.get_mut(seller) {
            windows.retain(|&w| w != (start, end));
        }
    }
}
