//! # Kitchen Flow
//!
//! Order coordination for a food-service operation: kitchen preparation and, for
//! delivery orders, courier dispatch, plus sync bookkeeping for orders that arrive from
//! external channels.
//!
//! ## Core Components
//!
//! - **[model]**: pure data ([`Order`](model::Order), drafts, [`Integration`](model::Integration)).
//! - **[transitions]**: the single validator for both coupled state machines.
//! - **[order_actor]**: one [`EntityActor`](entity_actor::EntityActor) per order.
//! - **[store]**: [`OrderStore`](store::OrderStore), the only mutation entry point, and
//!   its write-behind [`Journal`](store::Journal).
//! - **[urgency]**: read-time urgency and the periodic [`UrgencyTicker`](urgency::UrgencyTicker).
//! - **[sync_tracker]**: external-channel sync status, retry and the polling worker.
//! - **[api]**: axum routes.
//! - **[lifecycle]**: [`KitchenSystem`](lifecycle::KitchenSystem) wiring and shutdown.

pub mod api;
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod order_actor;
pub mod store;
pub mod sync_tracker;
pub mod transitions;
pub mod urgency;
