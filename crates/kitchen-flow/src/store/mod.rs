//! # Order Store
//!
//! The authoritative collection of orders and the single entry point for every mutation.
//! Boards, the HTTP API and the sync tracker all go through [`OrderStore`]; the
//! validator runs inside each order's actor, so no call site can skip it.
//!
//! ## Layout
//!
//! ```text
//!  OrderStore ──directory (RwLock, lookup only)──► EntityClient<Order> ─► EntityActor (one per order)
//!                                                                             │ on_changed / on_removed
//!                                                                             ▼
//!                                                        JournalHandle ─► Journal ─► Storage
//! ```
//!
//! The directory lock is held only to look up, insert or remove a client. Transitions
//! run in the order's own actor, so two orders never wait on each other.

pub mod journal;
pub mod storage;

pub use journal::{Journal, JournalHandle, PersistenceHealth};
pub use storage::{JsonFileStorage, MemoryStorage, Storage, StorageError, StoredOrders};

use crate::clock::Clock;
use crate::model::{
    Channel, DeliveryStatus, KitchenStatus, Order, OrderDraft, OrderId, OrderType, SyncStatus,
};
use crate::order_actor::{self, OrderAction, OrderContext, OrderError};
use crate::transitions::Transition;
use entity_actor::{EntityClient, EntityObserver, Outcome};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

/// Tuning knobs for [`OrderStore::open`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Mailbox capacity of each order actor.
    pub mailbox_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { mailbox_size: 32 }
    }
}

/// Selection for [`OrderStore::list`]. All set criteria must match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFilter {
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub kitchen_status: Option<KitchenStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub channel: Option<Channel>,
    pub sync_status: Option<SyncStatus>,
    pub include_canceled: bool,
    /// Only orders that have not left the kitchen.
    pub in_kitchen: bool,
    /// Only orders with live (non-terminal) delivery tracking.
    pub in_delivery: bool,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            order_type: None,
            kitchen_status: None,
            delivery_status: None,
            channel: None,
            sync_status: None,
            include_canceled: true,
            in_kitchen: false,
            in_delivery: false,
        }
    }
}

impl OrderFilter {
    /// What the kitchen board shows: live orders still in NUEVA, PREPARANDO or LISTA.
    pub fn kitchen_board() -> Self {
        Self {
            include_canceled: false,
            in_kitchen: true,
            ..Self::default()
        }
    }

    /// What the delivery board shows: live DELIVERY orders awaiting or out for delivery.
    pub fn delivery_board() -> Self {
        Self {
            order_type: Some(OrderType::Delivery),
            include_canceled: false,
            in_delivery: true,
            ..Self::default()
        }
    }

    pub fn sync(status: SyncStatus) -> Self {
        Self {
            sync_status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        if !self.include_canceled && order.is_canceled() {
            return false;
        }
        if self.in_kitchen && order.kitchen_status == KitchenStatus::Entregada {
            return false;
        }
        if self.in_delivery && !order.delivery_status.is_some_and(|s| !s.is_terminal()) {
            return false;
        }
        self.order_type.map_or(true, |t| order.order_type == t)
            && self.kitchen_status.map_or(true, |s| order.kitchen_status == s)
            && self
                .delivery_status
                .map_or(true, |s| order.delivery_status == Some(s))
            && self.channel.map_or(true, |c| order.channel() == c)
            && self.sync_status.map_or(true, |s| {
                order.integration.as_ref().map(|i| i.sync_status) == Some(s)
            })
    }
}

struct Inner {
    directory: RwLock<HashMap<OrderId, EntityClient<Order>>>,
    next_id: AtomicU32,
    journal: JournalHandle,
    context: OrderContext,
    options: StoreOptions,
}

/// Service object owning every live order. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OrderStore {
    inner: Arc<Inner>,
}

impl OrderStore {
    /// Restores the persisted collection, starts one actor per order and the journal.
    pub async fn open(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        options: StoreOptions,
    ) -> Result<Self, StorageError> {
        let stored = storage.load().await?;
        let next_id = stored.resume_id();

        let (journal, handle) = Journal::new(storage, &stored);
        tokio::spawn(journal.run());

        let store = Self {
            inner: Arc::new(Inner {
                directory: RwLock::new(HashMap::new()),
                next_id: AtomicU32::new(next_id),
                journal: handle,
                context: OrderContext { clock },
                options,
            }),
        };
        let restored = stored.orders.len();
        for order in stored.orders {
            store.spawn(order);
        }
        info!(restored, next_id, "Order store opened");
        Ok(store)
    }

    fn spawn(&self, order: Order) -> EntityClient<Order> {
        let id = order.id;
        let observer: Arc<dyn EntityObserver<Order>> = Arc::new(self.inner.journal.clone());
        let client = order_actor::spawn(
            order,
            self.inner.options.mailbox_size,
            observer,
            self.inner.context.clone(),
        );
        self.inner.directory.write().insert(id, client.clone());
        client
    }

    fn client(&self, id: OrderId) -> Result<EntityClient<Order>, OrderError> {
        self.inner
            .directory
            .read()
            .get(&id)
            .cloned()
            .ok_or(OrderError::NotFound(id))
    }

    /// Validates the draft, assigns id, number and `createdAt`, and persists the order.
    #[instrument(skip(self, draft), fields(order_type = %draft.order_type, channel = %draft.channel))]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderError> {
        draft.validate()?;
        let id = OrderId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let order = Order::from_draft(id, draft, self.inner.context.clock.now())?;

        self.inner.journal.record(&order);
        self.spawn(order.clone());
        info!(order_id = %id, order_number = %order.order_number, "Order created");
        Ok(order)
    }

    /// Last committed state of one order.
    pub fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        Ok(self.client(id)?.snapshot())
    }

    /// Snapshots of the matching orders, oldest first.
    pub fn list(&self, filter: &OrderFilter) -> Vec<Order> {
        let clients: Vec<EntityClient<Order>> =
            self.inner.directory.read().values().cloned().collect();
        let mut orders: Vec<Order> = clients
            .iter()
            .map(EntityClient::snapshot)
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    /// Runs `action` on one order. With `expected_version` set, a concurrent change in
    /// between fails the call with [`OrderError::Conflict`].
    pub async fn apply(
        &self,
        id: OrderId,
        action: OrderAction,
        expected_version: Option<u64>,
    ) -> Result<Outcome<Order>, OrderError> {
        let client = self.client(id)?;
        client
            .perform_action(action, expected_version)
            .await
            .map_err(|e| e.for_order(id))
    }

    async fn transition(&self, id: OrderId, transition: Transition) -> Result<Order, OrderError> {
        Ok(self.apply(id, transition.into(), None).await?.entity)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_kitchen_status(
        &self,
        id: OrderId,
        next: KitchenStatus,
    ) -> Result<Order, OrderError> {
        self.transition(id, Transition::Kitchen(next)).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn mark_as_delivered(&self, id: OrderId) -> Result<Order, OrderError> {
        self.transition(id, Transition::MarkDelivered).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn send_to_delivery(&self, id: OrderId) -> Result<Order, OrderError> {
        self.transition(id, Transition::SendToDelivery).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_delivery_status(
        &self,
        id: OrderId,
        next: DeliveryStatus,
    ) -> Result<Order, OrderError> {
        self.transition(id, Transition::Delivery(next)).await
    }

    #[instrument(skip(self, courier_id, courier_name), fields(order_id = %id))]
    pub async fn assign_courier(
        &self,
        id: OrderId,
        courier_id: impl Into<String>,
        courier_name: impl Into<String>,
    ) -> Result<Order, OrderError> {
        self.transition(
            id,
            Transition::AssignCourier {
                courier_id: courier_id.into(),
                courier_name: courier_name.into(),
            },
        )
        .await
    }

    #[instrument(skip(self, reason), fields(order_id = %id))]
    pub async fn cancel_order(
        &self,
        id: OrderId,
        reason: impl Into<String>,
    ) -> Result<Order, OrderError> {
        self.transition(
            id,
            Transition::Cancel {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Removes a handed-off or canceled order. Returns `false` for active orders.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete_order(&self, id: OrderId) -> Result<bool, OrderError> {
        let client = self.client(id)?;
        let deleted = client.delete().await.map_err(|e| e.for_order(id))?;
        if deleted {
            self.inner.directory.write().remove(&id);
            info!("Order deleted");
        }
        Ok(deleted)
    }

    pub fn persistence_health(&self) -> PersistenceHealth {
        self.inner.journal.health()
    }

    /// Waits until every change committed so far has been handed to storage.
    pub async fn flush(&self) -> PersistenceHealth {
        self.inner.journal.flush().await
    }

    pub fn len(&self) -> usize {
        self.inner.directory.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.inner.context.clock.clone()
    }
}
