//! # Order Actor
//!
//! Every order runs in its own [`EntityActor`](entity_actor::EntityActor). The actor is
//! the per-order lock: a cancel and a status change for the same order are processed one
//! after the other, never interleaved, while different orders proceed in parallel.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](entity_actor::ActorEntity) implementation for
//!   [`Order`](crate::model::Order): creation from a draft, lifecycle and sync actions
//! - [`error`] - [`OrderError`], the error taxonomy shared by the whole crate
//! - [`spawn()`] - starts one order actor and returns its client
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = order_actor::spawn(order, 32, journal, context);
//! let outcome = client
//!     .perform_action(Transition::Kitchen(KitchenStatus::Preparando).into(), None)
//!     .await?;
//! ```
//!
//! Application code goes through [`OrderStore`](crate::store::OrderStore), which owns
//! the directory of running actors.

pub mod entity;
pub mod error;

pub use entity::*;
pub use error::*;

use crate::model::Order;
use entity_actor::{EntityActor, EntityClient, EntityObserver};
use std::sync::Arc;

/// Spawns the actor owning `order` and returns its client.
pub fn spawn(
    order: Order,
    mailbox_size: usize,
    observer: Arc<dyn EntityObserver<Order>>,
    context: OrderContext,
) -> EntityClient<Order> {
    let (actor, client) = EntityActor::new(order, mailbox_size, observer);
    tokio::spawn(actor.run(context));
    client
}
