//! # Integration Sync Tracker
//!
//! Orders from external channels (POS, API, web, mobile) carry an
//! [`Integration`](crate::model::Integration) record saying whether the originating
//! channel has seen the latest state:
//!
//! ```text
//! PENDING --synced--> SYNCED
//! PENDING --failed--> FAILED --retry--> PENDING
//! SYNCED --order canceled--> PENDING
//! ```
//!
//! `FAILED` is sticky: only an explicit [`IntegrationSyncTracker::retry`] puts an order
//! back in the queue. The [`SyncWorker`] only ever pushes `PENDING` orders.
//!
//! ODIN orders have no integration record and reject every sync event.

pub mod mock;
pub mod transport;
pub mod worker;

pub use mock::MockTransport;
pub use transport::{LogTransport, SyncTransport, TransportError};
pub use worker::SyncWorker;

use crate::model::{Order, OrderId, SyncStatus};
use crate::order_actor::{OrderAction, OrderError};
use crate::store::{OrderFilter, OrderStore};
use crate::transitions::Verdict;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Operator asks to push a FAILED order again.
    Retry,
    Synced,
    Failed { reason: String },
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retry => f.write_str("retrySync"),
            Self::Synced => f.write_str("reportSynced"),
            Self::Failed { .. } => f.write_str("reportFailed"),
        }
    }
}

/// Decides whether a sync event applies. Cancellation does not freeze sync state.
pub fn validate_sync(order: &Order, event: &SyncEvent) -> Result<Verdict, OrderError> {
    if let SyncEvent::Failed { reason } = event {
        if reason.trim().is_empty() {
            return Err(OrderError::validation("a failed sync needs a reason"));
        }
    }

    let Some(integration) = order.integration.as_ref() else {
        return Err(illegal(order, event, "ODIN", "ODIN orders are not synchronized"));
    };
    let current = integration.sync_status;

    match (current, event) {
        (SyncStatus::Failed, SyncEvent::Retry) => Ok(Verdict::Apply),
        (SyncStatus::Pending, SyncEvent::Retry) => Ok(Verdict::NoOp),
        (SyncStatus::Synced, SyncEvent::Retry) => Err(illegal(
            order,
            event,
            &current.to_string(),
            "only FAILED orders can be retried",
        )),
        (SyncStatus::Pending, SyncEvent::Synced | SyncEvent::Failed { .. }) => Ok(Verdict::Apply),
        (SyncStatus::Synced, SyncEvent::Synced) | (SyncStatus::Failed, SyncEvent::Failed { .. }) => {
            Ok(Verdict::NoOp)
        }
        (SyncStatus::Synced, SyncEvent::Failed { .. })
        | (SyncStatus::Failed, SyncEvent::Synced) => Err(illegal(
            order,
            event,
            &current.to_string(),
            "no sync attempt is pending",
        )),
    }
}

/// Applies a validated sync event.
pub(crate) fn apply_sync(order: &mut Order, event: SyncEvent, now: DateTime<Utc>) {
    let Some(integration) = order.integration.as_mut() else {
        return;
    };
    match event {
        SyncEvent::Retry => {
            integration.sync_status = SyncStatus::Pending;
            integration.failed_reason = None;
        }
        SyncEvent::Synced => {
            integration.sync_status = SyncStatus::Synced;
            integration.last_sync_at = Some(now);
            integration.failed_reason = None;
        }
        SyncEvent::Failed { reason } => {
            integration.sync_status = SyncStatus::Failed;
            integration.last_sync_at = Some(now);
            integration.failed_reason = Some(reason.trim().to_string());
        }
    }
}

fn illegal(order: &Order, event: &SyncEvent, current: &str, reason: &str) -> OrderError {
    OrderError::IllegalTransition {
        order_id: order.id,
        attempted: event.to_string(),
        current: format!("sync={current}"),
        reason: reason.to_string(),
    }
}

/// Counts from one [`IntegrationSyncTracker::sync_pending`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncPass {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Sync bookkeeping on top of the [`OrderStore`]. Cloning shares the wake signal.
#[derive(Clone)]
pub struct IntegrationSyncTracker {
    store: OrderStore,
    transport: Arc<dyn SyncTransport>,
    wake: Arc<Notify>,
}

impl IntegrationSyncTracker {
    pub fn new(store: OrderStore, transport: Arc<dyn SyncTransport>) -> Self {
        Self {
            store,
            transport,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Moves a FAILED order back to PENDING and wakes the worker.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn retry(&self, id: OrderId) -> Result<Order, OrderError> {
        let outcome = self.store.apply(id, SyncEvent::Retry.into(), None).await?;
        if outcome.changed() {
            info!("Sync retry queued");
            self.wake.notify_one();
        }
        Ok(outcome.entity)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn report_synced(&self, id: OrderId) -> Result<Order, OrderError> {
        self.report(id, SyncEvent::Synced).await
    }

    #[instrument(skip(self, reason), fields(order_id = %id))]
    pub async fn report_failed(
        &self,
        id: OrderId,
        reason: impl Into<String>,
    ) -> Result<Order, OrderError> {
        self.report(
            id,
            SyncEvent::Failed {
                reason: reason.into(),
            },
        )
        .await
    }

    async fn report(&self, id: OrderId, event: SyncEvent) -> Result<Order, OrderError> {
        let outcome = self.store.apply(id, OrderAction::Sync(event), None).await?;
        Ok(outcome.entity)
    }

    /// External orders waiting for a push, oldest first. Canceled orders included.
    pub fn pending(&self) -> Vec<Order> {
        self.store.list(&OrderFilter::sync(SyncStatus::Pending))
    }

    /// External orders whose last push failed, oldest first.
    pub fn failed(&self) -> Vec<Order> {
        self.store.list(&OrderFilter::sync(SyncStatus::Failed))
    }

    /// Pushes every PENDING order once and records each result.
    pub async fn sync_pending(&self) -> SyncPass {
        let mut pass = SyncPass::default();
        for order in self.pending() {
            pass.attempted += 1;
            let recorded = match self.transport.push(&order).await {
                Ok(()) => {
                    pass.synced += 1;
                    self.report_synced(order.id).await
                }
                Err(e) => {
                    warn!(order_id = %order.id, channel = %order.channel(), error = %e, "Sync push failed");
                    pass.failed += 1;
                    self.report_failed(order.id, e.to_string()).await
                }
            };
            if let Err(e) = recorded {
                warn!(order_id = %order.id, error = %e, "Sync result not recorded");
            }
        }
        pass
    }

    pub(crate) fn wake_signal(&self) -> Arc<Notify> {
        self.wake.clone()
    }
}
