use super::OrderError;
use crate::clock::Clock;
use crate::model::{
    DeliveryInfo, DeliveryStatus, Integration, KitchenStatus, Order, OrderDraft, OrderId,
    OrderItem, OrderType, SyncStatus,
};
use crate::sync_tracker::{self, SyncEvent};
use crate::transitions::{self, Transition, Verdict};
use chrono::{DateTime, Utc};
use entity_actor::{ActorEntity, Applied};
use std::sync::Arc;

/// Operations an order actor understands.
#[derive(Debug, Clone)]
pub enum OrderAction {
    Lifecycle(Transition),
    Sync(SyncEvent),
}

impl From<Transition> for OrderAction {
    fn from(transition: Transition) -> Self {
        Self::Lifecycle(transition)
    }
}

impl From<SyncEvent> for OrderAction {
    fn from(event: SyncEvent) -> Self {
        Self::Sync(event)
    }
}

/// Dependencies injected into every order actor.
#[derive(Clone)]
pub struct OrderContext {
    pub clock: Arc<dyn Clock>,
}

impl ActorEntity for Order {
    type Id = OrderId;
    type Action = OrderAction;
    type Context = OrderContext;
    type Error = OrderError;

    fn id(&self) -> &OrderId {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn handle_action(&mut self, action: OrderAction, ctx: &OrderContext) -> Result<Applied, OrderError> {
        match action {
            OrderAction::Lifecycle(transition) => match transitions::validate(self, &transition)? {
                Verdict::NoOp => Ok(Applied::Unchanged),
                Verdict::Apply => {
                    let now = self.next_timestamp(ctx.clock.now());
                    self.apply_transition(transition, now);
                    Ok(Applied::Changed)
                }
            },
            OrderAction::Sync(event) => match sync_tracker::validate_sync(self, &event)? {
                Verdict::NoOp => Ok(Applied::Unchanged),
                Verdict::Apply => {
                    sync_tracker::apply_sync(self, event, ctx.clock.now());
                    Ok(Applied::Changed)
                }
            },
        }
    }

    /// Only orders that left the kitchen or were canceled may be removed.
    fn on_delete(&self, _ctx: &OrderContext) -> Result<bool, OrderError> {
        Ok(self.is_terminal())
    }
}

impl Order {
    /// Builds a fresh `NUEVA` order from a validated draft.
    pub fn from_draft(id: OrderId, draft: OrderDraft, now: DateTime<Utc>) -> Result<Self, OrderError> {
        draft.validate()?;

        let computed: f64 = draft
            .items
            .iter()
            .filter_map(|item| item.price.map(|p| p * f64::from(item.qty)))
            .sum();
        let items = draft
            .items
            .into_iter()
            .enumerate()
            .map(|(i, item)| OrderItem {
                id: format!("item_{}", i + 1),
                name: item.name.trim().to_string(),
                qty: item.qty,
                notes: item.notes,
                price: item.price,
            })
            .collect();
        let delivery = draft.delivery.map(|d| DeliveryInfo {
            address: d.address.trim().to_string(),
            reference: d.reference,
            phone: d.phone,
            ..Default::default()
        });
        let integration = draft
            .channel
            .is_external()
            .then(|| Integration::received(draft.channel, draft.external_order_id, now));

        Ok(Self {
            id,
            order_number: id.order_number(),
            order_type: draft.order_type,
            table_number: draft.table_number,
            customer: draft.customer,
            items,
            notes: draft.notes,
            priority: draft.priority,
            kitchen_status: KitchenStatus::Nueva,
            delivery_status: None,
            integration,
            delivery,
            payment_method: draft.payment_method,
            total: draft.total.unwrap_or(computed),
            created_at: now,
            kitchen_started_at: None,
            kitchen_ready_at: None,
            handed_off_at: None,
            canceled_at: None,
            cancel_reason: None,
            version: 0,
        })
    }

    /// Mutates the order for an already validated transition, stamping `now`.
    fn apply_transition(&mut self, transition: Transition, now: DateTime<Utc>) {
        match transition {
            Transition::Kitchen(KitchenStatus::Preparando) => {
                self.kitchen_status = KitchenStatus::Preparando;
                self.kitchen_started_at.get_or_insert(now);
            }
            Transition::Kitchen(KitchenStatus::Lista) => {
                self.kitchen_status = KitchenStatus::Lista;
                self.kitchen_ready_at = Some(now);
                if self.order_type == OrderType::Delivery && self.delivery_status.is_none() {
                    self.delivery_status = Some(DeliveryStatus::PendienteAsignar);
                }
            }
            // Rejected by the validator.
            Transition::Kitchen(KitchenStatus::Nueva | KitchenStatus::Entregada) => {}
            Transition::MarkDelivered | Transition::SendToDelivery => {
                self.kitchen_status = KitchenStatus::Entregada;
                self.handed_off_at = Some(now);
            }
            Transition::Delivery(status) => {
                self.delivery_status = Some(status);
                let info = self.delivery.get_or_insert_with(DeliveryInfo::default);
                match status {
                    DeliveryStatus::Entregado => info.delivered_at = Some(now),
                    DeliveryStatus::Cancelado => info.canceled_at = Some(now),
                    DeliveryStatus::PendienteAsignar | DeliveryStatus::EnRuta => {}
                }
            }
            Transition::AssignCourier {
                courier_id,
                courier_name,
            } => {
                let info = self.delivery.get_or_insert_with(DeliveryInfo::default);
                info.courier_id = Some(courier_id.trim().to_string());
                info.courier_name = Some(courier_name.trim().to_string());
                info.assigned_at = Some(now);
                self.delivery_status = Some(DeliveryStatus::EnRuta);
            }
            Transition::Cancel { reason } => {
                self.canceled_at = Some(now);
                self.cancel_reason = Some(reason.trim().to_string());
                if self.delivery_status.is_some_and(|s| !s.is_terminal()) {
                    self.delivery_status = Some(DeliveryStatus::Cancelado);
                    self.delivery
                        .get_or_insert_with(DeliveryInfo::default)
                        .canceled_at = Some(now);
                }
                // The originating channel must hear about the cancellation. FAILED stays
                // put until an explicit retry.
                if let Some(integration) = self.integration.as_mut() {
                    if integration.sync_status == SyncStatus::Synced {
                        integration.sync_status = SyncStatus::Pending;
                    }
                }
            }
        }
    }
}

impl OrderDraft {
    /// Creation rules. Checked before an id is allocated.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::validation("an order needs at least one item"));
        }
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(OrderError::validation("item name is required"));
            }
            if item.qty == 0 {
                return Err(OrderError::validation(format!(
                    "item '{}' must have a quantity greater than zero",
                    item.name.trim()
                )));
            }
            if item.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
                return Err(OrderError::validation(format!(
                    "item '{}' has an invalid price",
                    item.name.trim()
                )));
            }
        }
        if self.total.is_some_and(|t| !t.is_finite() || t < 0.0) {
            return Err(OrderError::validation("total must be a non-negative amount"));
        }

        match self.order_type {
            OrderType::Delivery => {
                if self
                    .delivery
                    .as_ref()
                    .map_or(true, |d| d.address.trim().is_empty())
                {
                    return Err(OrderError::validation(
                        "DELIVERY orders require a delivery address",
                    ));
                }
            }
            OrderType::Mesa | OrderType::ParaLlevar => {
                if self.delivery.is_some() {
                    return Err(OrderError::validation(format!(
                        "{} orders cannot carry delivery data",
                        self.order_type
                    )));
                }
            }
        }
        if self.order_type == OrderType::Mesa && self.table_number.is_none() {
            return Err(OrderError::validation("MESA orders require a table number"));
        }
        if !self.channel.is_external() && self.external_order_id.is_some() {
            return Err(OrderError::validation(
                "ODIN orders cannot carry an external order id",
            ));
        }
        Ok(())
    }
}
