//! Orders: a customer's unit of demand moving through the kitchen and, for delivery
//! orders, through courier dispatch.
//!
//! # Actor Framework
//! [`Order`] implements the [`ActorEntity`](entity_actor::ActorEntity) trait (see
//! [`crate::order_actor::entity`]), so every order lives in its own
//! [`EntityActor`](entity_actor::EntityActor) and all of its mutations are serialized.
use crate::model::Integration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl OrderId {
    /// Human-readable order number, e.g. `ORD-0007`.
    pub fn order_number(&self) -> String {
        format!("ORD-{:04}", self.0)
    }
}

impl From<u32> for OrderId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = String;

    /// Accepts both `order_7` and `7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("order_").unwrap_or(s);
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| format!("invalid order id: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Mesa,
    Delivery,
    ParaLlevar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Normal,
    Urgente,
}

/// Kitchen stages. The derived ordering is the progression order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenStatus {
    Nueva,
    Preparando,
    Lista,
    Entregada,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    PendienteAsignar,
    EnRuta,
    Entregado,
    Cancelado,
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Entregado | Self::Cancelado)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Efectivo,
    Tarjeta,
    Transferencia,
    Online,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Mesa => "MESA",
            Self::Delivery => "DELIVERY",
            Self::ParaLlevar => "PARA_LLEVAR",
        })
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Normal => "NORMAL",
            Self::Urgente => "URGENTE",
        })
    }
}

impl Display for KitchenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Nueva => "NUEVA",
            Self::Preparando => "PREPARANDO",
            Self::Lista => "LISTA",
            Self::Entregada => "ENTREGADA",
        })
    }
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PendienteAsignar => "PENDIENTE_ASIGNAR",
            Self::EnRuta => "EN_RUTA",
            Self::Entregado => "ENTREGADO",
            Self::Cancelado => "CANCELADO",
        })
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Efectivo => "EFECTIVO",
            Self::Tarjeta => "TARJETA",
            Self::Transferencia => "TRANSFERENCIA",
            Self::Online => "ONLINE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Address and courier fields of a delivery order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
}

impl DeliveryInfo {
    pub fn has_courier(&self) -> bool {
        self.courier_id.is_some() && self.courier_name.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub priority: Priority,
    pub kitchen_status: KitchenStatus,
    /// Absent until the kitchen marks a delivery order ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,
    /// Only orders from external channels carry this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<Integration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitchen_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitchen_ready_at: Option<DateTime<Utc>>,
    /// When the order left the kitchen (served, picked up or sent to delivery).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handed_off_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub version: u64,
}

impl Order {
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// Terminal for the kitchen: handed off or canceled. Only these may be deleted.
    pub fn is_terminal(&self) -> bool {
        self.kitchen_status == KitchenStatus::Entregada || self.is_canceled()
    }

    pub fn courier_assigned(&self) -> bool {
        self.delivery.as_ref().is_some_and(DeliveryInfo::has_courier)
    }

    pub fn channel(&self) -> crate::model::Channel {
        self.integration
            .as_ref()
            .map(|i| i.channel)
            .unwrap_or(crate::model::Channel::Odin)
    }

    /// Latest lifecycle timestamp recorded so far.
    pub fn latest_timestamp(&self) -> DateTime<Utc> {
        let delivery = self.delivery.as_ref();
        [
            self.kitchen_started_at,
            self.kitchen_ready_at,
            self.handed_off_at,
            delivery.and_then(|d| d.assigned_at),
            delivery.and_then(|d| d.delivered_at),
            delivery.and_then(|d| d.canceled_at),
            self.canceled_at,
        ]
        .into_iter()
        .flatten()
        .fold(self.created_at, |latest, t| latest.max(t))
    }

    /// Timestamp for the next lifecycle event, never earlier than any recorded one.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.latest_timestamp())
    }

    /// Short state description for diagnostics, e.g. `kitchen=LISTA delivery=EN_RUTA`.
    pub fn state_label(&self) -> String {
        let mut label = format!("kitchen={}", self.kitchen_status);
        if let Some(status) = self.delivery_status {
            label.push_str(&format!(" delivery={status}"));
        }
        if self.is_canceled() {
            label.push_str(" canceled");
        }
        label
    }
}

/// Payload for creating a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(default)]
    pub table_number: Option<u32>,
    #[serde(default)]
    pub customer: Option<Customer>,
    pub items: Vec<ItemDraft>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub delivery: Option<DeliveryDraft>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Explicit total; computed from item prices when absent.
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub channel: crate::model::Channel,
    #[serde(default)]
    pub external_order_id: Option<String>,
}

impl OrderDraft {
    /// Minimal draft; fill the optional fields directly.
    pub fn new(order_type: OrderType, items: Vec<ItemDraft>) -> Self {
        Self {
            order_type,
            table_number: None,
            customer: None,
            items,
            notes: None,
            priority: Priority::Normal,
            delivery: None,
            payment_method: None,
            total: None,
            channel: crate::model::Channel::Odin,
            external_order_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: String,
    pub qty: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, qty: u32, price: Option<f64>) -> Self {
        Self {
            name: name.into(),
            qty,
            notes: None,
            price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDraft {
    pub address: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_parsing_and_number() {
        assert_eq!("order_12".parse::<OrderId>().unwrap(), OrderId(12));
        assert_eq!("12".parse::<OrderId>().unwrap(), OrderId(12));
        assert!("order_x".parse::<OrderId>().is_err());
        assert_eq!(OrderId(7).order_number(), "ORD-0007");
        assert_eq!(OrderId(7).to_string(), "order_7");
    }

    #[test]
    fn test_status_display_matches_wire_format() {
        for status in [
            KitchenStatus::Nueva,
            KitchenStatus::Preparando,
            KitchenStatus::Lista,
            KitchenStatus::Entregada,
        ] {
            assert_eq!(serde_json::json!(status), status.to_string().as_str());
        }
        for status in [
            DeliveryStatus::PendienteAsignar,
            DeliveryStatus::EnRuta,
            DeliveryStatus::Entregado,
            DeliveryStatus::Cancelado,
        ] {
            assert_eq!(serde_json::json!(status), status.to_string().as_str());
        }
        assert_eq!(OrderType::ParaLlevar.to_string(), "PARA_LLEVAR");
        assert_eq!(Priority::Urgente.to_string(), "URGENTE");
        assert_eq!(PaymentMethod::Transferencia.to_string(), "TRANSFERENCIA");
    }

    #[test]
    fn test_kitchen_status_ordering_is_progression() {
        assert!(KitchenStatus::Nueva < KitchenStatus::Preparando);
        assert!(KitchenStatus::Preparando < KitchenStatus::Lista);
        assert!(KitchenStatus::Lista < KitchenStatus::Entregada);
    }
}
