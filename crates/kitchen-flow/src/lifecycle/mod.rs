//! # System Lifecycle & Orchestration
//!
//! Individual actors are simple; wiring them together is where the complexity lives.
//! [`KitchenSystem`] is the conductor.
//!
//! ## Startup
//!
//! ```text
//! Storage ─► OrderStore::open ─► one EntityActor per stored order + Journal
//!                  │
//!                  ├─► IntegrationSyncTracker ─► SyncWorker     (background)
//!                  └─► UrgencyTicker                              (background)
//! ```
//!
//! Both background tasks share one [`CancellationToken`]. Neither blocks the other and
//! neither blocks order transitions.
//!
//! ## Shutdown
//!
//! 1. **Cancel the token** - the worker and the ticker leave their `select!` loops.
//! 2. **Await the tasks** - no pass is cut off halfway.
//! 3. **Flush the journal** - every committed change reaches storage (or is counted as
//!    a failure), and the final [`PersistenceHealth`] is returned.
//!
//! Order actors stop on their own once the last client (held by the store) is dropped.

use crate::api::{self, AppState};
use crate::clock::Clock;
use crate::config::Config;
use crate::store::{OrderStore, PersistenceHealth, Storage, StorageError, StoreOptions};
use crate::sync_tracker::{IntegrationSyncTracker, SyncTransport, SyncWorker};
use crate::urgency::{UrgencyPolicy, UrgencyReport, UrgencyTicker};
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The running order-coordination service.
pub struct KitchenSystem {
    pub store: OrderStore,
    pub tracker: IntegrationSyncTracker,
    pub policy: UrgencyPolicy,
    urgency: watch::Receiver<UrgencyReport>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl KitchenSystem {
    /// Opens the store and starts the background tasks.
    pub async fn start(
        config: &Config,
        storage: Arc<dyn Storage>,
        transport: Arc<dyn SyncTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let options = StoreOptions {
            mailbox_size: config.order_mailbox_size,
        };
        let store = OrderStore::open(storage, clock.clone(), options).await?;
        let tracker = IntegrationSyncTracker::new(store.clone(), transport);
        let policy = config.urgency_policy();
        let shutdown = CancellationToken::new();

        let worker = SyncWorker::new(tracker.clone(), config.sync_poll, shutdown.clone());
        let (ticker, urgency) = UrgencyTicker::new(
            store.clone(),
            policy,
            clock,
            config.urgency_tick,
            shutdown.clone(),
        );
        let handles = vec![tokio::spawn(worker.run()), tokio::spawn(ticker.run())];

        info!(orders = store.len(), "Kitchen system started");
        Ok(Self {
            store,
            tracker,
            policy,
            urgency,
            shutdown,
            handles,
        })
    }

    pub fn urgency(&self) -> UrgencyReport {
        self.urgency.borrow().clone()
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            tracker: self.tracker.clone(),
            policy: self.policy,
            urgency: self.urgency.clone(),
        }
    }

    pub fn router(&self) -> Router {
        api::router(self.app_state())
    }

    /// Token cancelled by [`KitchenSystem::shutdown`]; lets callers tie other tasks to it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops the background tasks and flushes pending writes.
    pub async fn shutdown(self) -> PersistenceHealth {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        let health = self.store.flush().await;
        info!(
            writes = health.writes,
            failures = health.failures,
            "Kitchen system stopped"
        );
        health
    }
}
