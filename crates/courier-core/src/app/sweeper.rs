//! RetentionSweeper: periodic eviction of idle task sets.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::status_store::StatusStore;

/// Handle to the background sweep loop.
///
/// Dropping the handle does not stop the loop; call `stop`.
pub struct RetentionSweeper {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl RetentionSweeper {
    pub fn spawn(store: Arc<StatusStore>, every: Duration) -> Self {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        debug!("retention sweeper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let evicted = store.evict_expired();
                        if evicted > 0 {
                            debug!(evicted, remaining = store.len(), "evicted idle task sets");
                        }
                    }
                }
            }
        });

        Self { cancel, join }
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        // ignore join error: the loop has no panicking paths
        let _ = self.join.await;
    }
}
