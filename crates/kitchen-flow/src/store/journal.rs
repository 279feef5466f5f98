//! Write-behind persistence.
//!
//! Order actors never do I/O. They report committed changes to a [`JournalHandle`]
//! (their [`EntityObserver`]), which forwards them over an unbounded channel to the
//! [`Journal`] task. The journal mirrors the whole collection and writes it out after
//! each batch of changes; everything queued while a write was in flight is folded into
//! the next one.
//!
//! A failed write is logged and counted in [`PersistenceHealth`]. The collection stays
//! marked unwritten until a save succeeds, so the next change or [`JournalHandle::flush`]
//! retries it. In-memory state is never rolled back.

use super::storage::{Storage, StoredOrders};
use crate::model::{Order, OrderId};
use chrono::{DateTime, Utc};
use entity_actor::EntityObserver;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceHealth {
    pub writes: u64,
    pub failures: u64,
    /// Failures since the last successful write.
    pub consecutive_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_write_at: Option<DateTime<Utc>>,
}

impl PersistenceHealth {
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }
}

enum JournalCommand {
    Upsert(Order),
    Remove(OrderId),
    Flush {
        respond_to: oneshot::Sender<PersistenceHealth>,
    },
}

/// Cloneable sender side of the journal. Also the observer handed to every order actor.
#[derive(Clone)]
pub struct JournalHandle {
    sender: mpsc::UnboundedSender<JournalCommand>,
    health: watch::Receiver<PersistenceHealth>,
}

impl JournalHandle {
    pub fn record(&self, order: &Order) {
        self.send(JournalCommand::Upsert(order.clone()));
    }

    pub fn health(&self) -> PersistenceHealth {
        self.health.borrow().clone()
    }

    /// Resolves once every change queued before this call has been written, retrying an
    /// earlier failed write. The returned health says whether that succeeded.
    pub async fn flush(&self) -> PersistenceHealth {
        let (respond_to, response) = oneshot::channel();
        self.send(JournalCommand::Flush { respond_to });
        match response.await {
            Ok(health) => health,
            Err(_) => self.health(),
        }
    }

    fn send(&self, command: JournalCommand) {
        if self.sender.send(command).is_err() {
            warn!("Journal stopped; change not persisted");
        }
    }
}

impl EntityObserver<Order> for JournalHandle {
    fn on_changed(&self, order: &Order) {
        self.record(order);
    }

    fn on_removed(&self, id: &OrderId) {
        self.send(JournalCommand::Remove(*id));
    }
}

/// The persistence task. Owns the mirror of the collection and the storage backend.
pub struct Journal {
    receiver: mpsc::UnboundedReceiver<JournalCommand>,
    orders: BTreeMap<OrderId, Order>,
    next_id: u32,
    /// Set by every change, cleared only by a successful save.
    needs_write: bool,
    storage: Arc<dyn Storage>,
    health: watch::Sender<PersistenceHealth>,
}

impl Journal {
    /// Creates the journal mirroring `stored`, which is assumed already written.
    pub fn new(storage: Arc<dyn Storage>, stored: &StoredOrders) -> (Self, JournalHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (health, health_rx) = watch::channel(PersistenceHealth::default());
        let journal = Self {
            receiver,
            orders: stored.orders.iter().map(|o| (o.id, o.clone())).collect(),
            next_id: stored.resume_id(),
            needs_write: false,
            storage,
            health,
        };
        let handle = JournalHandle {
            sender,
            health: health_rx,
        };
        (journal, handle)
    }

    /// Runs until every [`JournalHandle`] is dropped.
    pub async fn run(mut self) {
        debug!(orders = self.orders.len(), "Journal started");
        while let Some(first) = self.receiver.recv().await {
            let mut waiters = Vec::new();
            self.absorb(first, &mut waiters);
            while let Ok(next) = self.receiver.try_recv() {
                self.absorb(next, &mut waiters);
            }

            if self.needs_write {
                self.write().await;
            }
            let health = self.health.borrow().clone();
            for respond_to in waiters {
                let _ = respond_to.send(health.clone());
            }
        }
        debug!("Journal shutdown");
    }

    fn absorb(
        &mut self,
        command: JournalCommand,
        waiters: &mut Vec<oneshot::Sender<PersistenceHealth>>,
    ) {
        match command {
            JournalCommand::Upsert(order) => {
                self.next_id = self.next_id.max(order.id.0 + 1);
                self.orders.insert(order.id, order);
                self.needs_write = true;
            }
            JournalCommand::Remove(id) => {
                self.needs_write |= self.orders.remove(&id).is_some();
            }
            JournalCommand::Flush { respond_to } => waiters.push(respond_to),
        }
    }

    async fn write(&mut self) {
        let stored = StoredOrders::new(self.next_id, self.orders.values().cloned().collect());
        match self.storage.save(&stored).await {
            Ok(()) => {
                self.needs_write = false;
                self.health.send_modify(|h| {
                    h.writes += 1;
                    h.consecutive_failures = 0;
                    h.last_write_at = Some(Utc::now());
                });
                debug!(orders = stored.orders.len(), next_id = stored.next_id, "Collection persisted");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    orders = stored.orders.len(),
                    "Persistence write failed; in-memory state kept"
                );
                self.health.send_modify(|h| {
                    h.failures += 1;
                    h.consecutive_failures += 1;
                    h.last_error = Some(e.to_string());
                });
            }
        }
    }
}
