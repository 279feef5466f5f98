use super::IntegrationSyncTracker;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Background task pushing PENDING orders to their channels.
///
/// Runs a pass on every tick and whenever [`IntegrationSyncTracker::retry`] queues an
/// order. Stops when `shutdown` is cancelled.
pub struct SyncWorker {
    tracker: IntegrationSyncTracker,
    interval: Duration,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        tracker: IntegrationSyncTracker,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            tracker,
            interval,
            shutdown,
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Sync worker started");
        let wake = self.tracker.wake_signal();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Sync worker received shutdown signal");
                    return;
                }
                _ = ticker.tick() => {}
                _ = wake.notified() => {
                    debug!("Sync worker woken by retry");
                }
            }

            let pass = self.tracker.sync_pending().await;
            if pass.attempted > 0 {
                info!(
                    attempted = pass.attempted,
                    synced = pass.synced,
                    failed = pass.failed,
                    "Sync pass finished"
                );
            }
        }
    }
}
