//! # Urgency Classifier
//!
//! Urgency depends on "now", so it is never stored on the order. Readers call
//! [`UrgencyPolicy::classify`] at read time; the [`UrgencyTicker`] recomputes a
//! collection-wide [`UrgencyReport`] on a fixed tick so boards can refresh.
//!
//! - Kitchen: still in the kitchen and either `URGENTE` or older than `kitchen_after`.
//! - Delivery: delivery tracking live (not ENTREGADO/CANCELADO) and older than
//!   `delivery_after`.
//!
//! Canceled orders are never urgent.

use crate::clock::Clock;
use crate::model::{KitchenStatus, Order, OrderId, Priority};
use crate::store::{OrderFilter, OrderStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgencyPolicy {
    pub kitchen_after: Duration,
    pub delivery_after: Duration,
}

impl Default for UrgencyPolicy {
    fn default() -> Self {
        Self {
            kitchen_after: Duration::minutes(15),
            delivery_after: Duration::minutes(20),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Urgency {
    pub kitchen: bool,
    pub delivery: bool,
}

impl Urgency {
    pub fn any(&self) -> bool {
        self.kitchen || self.delivery
    }
}

impl UrgencyPolicy {
    pub fn from_minutes(kitchen: i64, delivery: i64) -> Self {
        Self {
            kitchen_after: Duration::minutes(kitchen),
            delivery_after: Duration::minutes(delivery),
        }
    }

    /// `URGENTE` priority only counts while the order is still live in the kitchen.
    /// Handed-off and canceled orders are never kitchen-urgent.
    pub fn kitchen_urgent(&self, order: &Order, now: DateTime<Utc>) -> bool {
        if order.is_canceled() || order.kitchen_status == KitchenStatus::Entregada {
            return false;
        }
        order.priority == Priority::Urgente || now - order.created_at > self.kitchen_after
    }

    pub fn delivery_urgent(&self, order: &Order, now: DateTime<Utc>) -> bool {
        if order.is_canceled() {
            return false;
        }
        match order.delivery_status {
            Some(status) if !status.is_terminal() => now - order.created_at > self.delivery_after,
            _ => false,
        }
    }

    pub fn classify(&self, order: &Order, now: DateTime<Utc>) -> Urgency {
        Urgency {
            kitchen: self.kitchen_urgent(order, now),
            delivery: self.delivery_urgent(order, now),
        }
    }

    pub fn report(&self, orders: &[Order], now: DateTime<Utc>) -> UrgencyReport {
        let mut report = UrgencyReport {
            computed_at: Some(now),
            ..UrgencyReport::default()
        };
        for order in orders {
            let urgency = self.classify(order, now);
            if urgency.kitchen {
                report.kitchen.push(order.id);
            }
            if urgency.delivery {
                report.delivery.push(order.id);
            }
        }
        report
    }
}

/// Urgent order ids at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyReport {
    /// `None` until the first tick.
    pub computed_at: Option<DateTime<Utc>>,
    pub kitchen: Vec<OrderId>,
    pub delivery: Vec<OrderId>,
}

/// Periodic recomputation of the [`UrgencyReport`], published on a `watch` channel.
pub struct UrgencyTicker {
    store: OrderStore,
    policy: UrgencyPolicy,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
    shutdown: CancellationToken,
    report: watch::Sender<UrgencyReport>,
}

impl UrgencyTicker {
    pub fn new(
        store: OrderStore,
        policy: UrgencyPolicy,
        clock: Arc<dyn Clock>,
        interval: std::time::Duration,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<UrgencyReport>) {
        let (report, report_rx) = watch::channel(UrgencyReport::default());
        let ticker = Self {
            store,
            policy,
            clock,
            interval,
            shutdown,
            report,
        };
        (ticker, report_rx)
    }

    /// Computes and publishes one report, logging orders that just became urgent.
    pub fn tick(&self) -> UrgencyReport {
        let orders = self.store.list(&OrderFilter {
            include_canceled: false,
            ..OrderFilter::default()
        });
        let next = self.policy.report(&orders, self.clock.now());

        let previous = self.report.borrow().clone();
        let was_kitchen: HashSet<OrderId> = previous.kitchen.into_iter().collect();
        let was_delivery: HashSet<OrderId> = previous.delivery.into_iter().collect();
        for id in next.kitchen.iter().filter(|id| !was_kitchen.contains(id)) {
            info!(order_id = %id, "Order became urgent in the kitchen");
        }
        for id in next.delivery.iter().filter(|id| !was_delivery.contains(id)) {
            info!(order_id = %id, "Order became urgent in delivery");
        }

        self.report.send_replace(next.clone());
        next
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Urgency ticker started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Urgency ticker received shutdown signal");
                    return;
                }
                _ = ticker.tick() => {
                    let report = self.tick();
                    debug!(kitchen = report.kitchen.len(), delivery = report.delivery.len(), "Urgency recomputed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeliveryStatus, ItemDraft, OrderDraft, OrderType};

    fn order(order_type: OrderType, created_at: DateTime<Utc>) -> Order {
        let mut draft = OrderDraft::new(order_type, vec![ItemDraft::new("Causa", 1, None)]);
        match order_type {
            OrderType::Mesa => draft.table_number = Some(1),
            OrderType::Delivery => {
                draft.delivery = Some(crate::model::DeliveryDraft {
                    address: "Calle Lima 12".into(),
                    reference: None,
                    phone: None,
                })
            }
            OrderType::ParaLlevar => {}
        }
        Order::from_draft(OrderId(1), draft, created_at).unwrap()
    }

    #[test]
    fn test_kitchen_urgency_after_fifteen_minutes() {
        let policy = UrgencyPolicy::default();
        let t = Utc::now();
        let mut o = order(OrderType::Mesa, t);
        o.kitchen_status = KitchenStatus::Preparando;

        assert!(policy.kitchen_urgent(&o, t + Duration::minutes(16)));
        assert!(!policy.kitchen_urgent(&o, t + Duration::minutes(14)));
    }

    #[test]
    fn test_urgente_priority_is_urgent_immediately() {
        let policy = UrgencyPolicy::default();
        let t = Utc::now();
        let mut o = order(OrderType::ParaLlevar, t);
        o.priority = Priority::Urgente;
        assert!(policy.kitchen_urgent(&o, t));

        o.kitchen_status = KitchenStatus::Entregada;
        assert!(!policy.kitchen_urgent(&o, t));
    }

    #[test]
    fn test_delivery_urgency_needs_live_tracking() {
        let policy = UrgencyPolicy::default();
        let t = Utc::now();
        let late = t + Duration::minutes(25);
        let mut o = order(OrderType::Delivery, t);

        assert!(!policy.delivery_urgent(&o, late));
        o.delivery_status = Some(DeliveryStatus::EnRuta);
        assert!(policy.delivery_urgent(&o, late));
        assert!(!policy.delivery_urgent(&o, t + Duration::minutes(19)));
        o.delivery_status = Some(DeliveryStatus::Entregado);
        assert!(!policy.delivery_urgent(&o, late));
    }

    #[test]
    fn test_canceled_orders_are_never_urgent() {
        let policy = UrgencyPolicy::default();
        let t = Utc::now();
        let mut o = order(OrderType::Delivery, t);
        o.priority = Priority::Urgente;
        o.delivery_status = Some(DeliveryStatus::PendienteAsignar);
        o.canceled_at = Some(t);
        assert!(!policy.classify(&o, t + Duration::hours(2)).any());
    }

    #[test]
    fn test_report_collects_ids() {
        let policy = UrgencyPolicy::from_minutes(5, 10);
        let t = Utc::now();
        let fresh = order(OrderType::ParaLlevar, t);
        let mut old = order(OrderType::Delivery, t - Duration::minutes(30));
        old.id = OrderId(2);
        old.delivery_status = Some(DeliveryStatus::PendienteAsignar);

        let report = policy.report(&[fresh, old], t);
        assert_eq!(report.kitchen, vec![OrderId(2)]);
        assert_eq!(report.delivery, vec![OrderId(2)]);
        assert_eq!(report.computed_at, Some(t));
    }
}
