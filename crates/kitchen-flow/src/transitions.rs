//! # State Transition Validator
//!
//! Pure rules deciding whether a requested change is legal for an order. The kitchen
//! and delivery machines share one entity, so both are validated here, together, by a
//! single function: the coupling rule ("no delivery tracking before the food is
//! ready") cannot be bypassed by calling a different entry point.
//!
//! ```text
//! kitchen:   NUEVA -> PREPARANDO -> LISTA -> ENTREGADA   (last edge: markAsDelivered / sendToDelivery)
//! delivery:  PENDIENTE_ASIGNAR -> EN_RUTA -> ENTREGADO   (first edge: assignCourier)
//!            any non-terminal  -> CANCELADO
//! cancel:    any kitchen state except ENTREGADA, terminal
//! ```
//!
//! [`validate`] answers with a [`Verdict`]: `Apply`, `NoOp` (target already reached, or
//! the order is frozen by cancellation) or an [`OrderError`].

use crate::model::{DeliveryStatus, KitchenStatus, Order, OrderType};
use crate::order_actor::OrderError;
use std::fmt::Display;

/// Longest accepted cancellation reason, in characters.
pub const MAX_CANCEL_REASON_CHARS: usize = 200;

/// Lifecycle operations on an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Generic kitchen status set. Never reaches `ENTREGADA`.
    Kitchen(KitchenStatus),
    /// MESA / PARA_LLEVAR leave the kitchen.
    MarkDelivered,
    /// DELIVERY orders leave the kitchen; delivery tracking continues on its own.
    SendToDelivery,
    /// Generic delivery status set. Never the path into `EN_RUTA` without a courier.
    Delivery(DeliveryStatus),
    AssignCourier {
        courier_id: String,
        courier_name: String,
    },
    Cancel {
        reason: String,
    },
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kitchen(status) => write!(f, "setKitchenStatus({status})"),
            Self::MarkDelivered => f.write_str("markAsDelivered"),
            Self::SendToDelivery => f.write_str("sendToDelivery"),
            Self::Delivery(status) => write!(f, "setDeliveryStatus({status})"),
            Self::AssignCourier { courier_id, .. } => write!(f, "assignCourier({courier_id})"),
            Self::Cancel { .. } => f.write_str("cancelOrder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Apply,
    NoOp,
}

/// Decides whether `transition` may be applied to `order`.
pub fn validate(order: &Order, transition: &Transition) -> Result<Verdict, OrderError> {
    // Malformed input is rejected even on frozen orders.
    match transition {
        Transition::Cancel { reason } => validate_cancel_reason(reason)?,
        Transition::AssignCourier {
            courier_id,
            courier_name,
        } => {
            if courier_id.trim().is_empty() || courier_name.trim().is_empty() {
                return Err(OrderError::validation("courier id and name are required"));
            }
        }
        _ => {}
    }

    if order.is_canceled() {
        return Ok(Verdict::NoOp);
    }

    match transition {
        Transition::Kitchen(next) => kitchen(order, *next, transition),
        Transition::MarkDelivered => hand_off(order, transition, false),
        Transition::SendToDelivery => hand_off(order, transition, true),
        Transition::Delivery(next) => delivery(order, *next, transition),
        Transition::AssignCourier { courier_id, .. } => assign(order, courier_id, transition),
        Transition::Cancel { .. } => {
            if order.kitchen_status == KitchenStatus::Entregada {
                Ok(Verdict::NoOp)
            } else {
                Ok(Verdict::Apply)
            }
        }
    }
}

pub fn validate_cancel_reason(reason: &str) -> Result<(), OrderError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(OrderError::validation("cancel reason is required"));
    }
    if reason.chars().count() > MAX_CANCEL_REASON_CHARS {
        return Err(OrderError::validation(format!(
            "cancel reason exceeds {MAX_CANCEL_REASON_CHARS} characters"
        )));
    }
    Ok(())
}

fn kitchen(order: &Order, next: KitchenStatus, t: &Transition) -> Result<Verdict, OrderError> {
    let current = order.kitchen_status;
    if next == current {
        return Ok(Verdict::NoOp);
    }
    match (current, next) {
        (KitchenStatus::Nueva, KitchenStatus::Preparando)
        | (KitchenStatus::Preparando, KitchenStatus::Lista) => Ok(Verdict::Apply),
        (_, KitchenStatus::Entregada) => Err(illegal(
            order,
            t,
            "ENTREGADA is reached only through markAsDelivered or sendToDelivery",
        )),
        _ if next < current => Err(illegal(order, t, "kitchen status never regresses")),
        _ => Err(illegal(order, t, "kitchen stages cannot be skipped")),
    }
}

fn hand_off(order: &Order, t: &Transition, to_delivery: bool) -> Result<Verdict, OrderError> {
    let is_delivery = order.order_type == OrderType::Delivery;
    if to_delivery && !is_delivery {
        return Err(illegal(order, t, "only DELIVERY orders are sent to delivery"));
    }
    if !to_delivery && is_delivery {
        return Err(illegal(
            order,
            t,
            "DELIVERY orders leave the kitchen through sendToDelivery",
        ));
    }
    match order.kitchen_status {
        KitchenStatus::Entregada => Ok(Verdict::NoOp),
        KitchenStatus::Lista => Ok(Verdict::Apply),
        _ => Err(illegal(order, t, "order is not ready")),
    }
}

fn delivery(order: &Order, next: DeliveryStatus, t: &Transition) -> Result<Verdict, OrderError> {
    if order.order_type != OrderType::Delivery {
        return Err(illegal(order, t, "only DELIVERY orders have delivery tracking"));
    }
    let current = match order.delivery_status {
        Some(status) if order.kitchen_status >= KitchenStatus::Lista => status,
        _ => {
            return Err(illegal(
                order,
                t,
                "delivery tracking starts when the kitchen marks the order ready",
            ))
        }
    };
    if next == current {
        return Ok(Verdict::NoOp);
    }
    match (current, next) {
        (DeliveryStatus::PendienteAsignar, DeliveryStatus::EnRuta) => {
            if order.courier_assigned() {
                Ok(Verdict::Apply)
            } else {
                Err(illegal(
                    order,
                    t,
                    "EN_RUTA requires an assigned courier (use assignCourier)",
                ))
            }
        }
        (DeliveryStatus::EnRuta, DeliveryStatus::Entregado) => Ok(Verdict::Apply),
        (DeliveryStatus::PendienteAsignar | DeliveryStatus::EnRuta, DeliveryStatus::Cancelado) => {
            Ok(Verdict::Apply)
        }
        (status, _) if status.is_terminal() => Err(illegal(order, t, "delivery already finished")),
        _ => Err(illegal(order, t, "not a legal delivery successor")),
    }
}

fn assign(order: &Order, courier_id: &str, t: &Transition) -> Result<Verdict, OrderError> {
    if order.order_type != OrderType::Delivery {
        return Err(illegal(order, t, "only DELIVERY orders take a courier"));
    }
    match order.delivery_status {
        Some(DeliveryStatus::PendienteAsignar) => Ok(Verdict::Apply),
        Some(DeliveryStatus::EnRuta)
            if order
                .delivery
                .as_ref()
                .and_then(|d| d.courier_id.as_deref())
                == Some(courier_id.trim()) =>
        {
            Ok(Verdict::NoOp)
        }
        Some(_) => Err(illegal(
            order,
            t,
            "a courier is assigned only while PENDIENTE_ASIGNAR",
        )),
        None => Err(illegal(
            order,
            t,
            "delivery tracking starts when the kitchen marks the order ready",
        )),
    }
}

fn illegal(order: &Order, t: &Transition, reason: &str) -> OrderError {
    OrderError::IllegalTransition {
        order_id: order.id,
        attempted: t.to_string(),
        current: order.state_label(),
        reason: reason.to_string(),
    }
}
