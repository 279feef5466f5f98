//! # Entity Actor
//!
//! Building blocks for running **one actor per entity**. Every entity gets its own
//! Tokio task and mailbox, so requests against the same entity are processed strictly
//! one after another while requests against different entities run fully in parallel.
//!
//! ## Why one actor per entity?
//!
//! A single actor owning a whole collection serializes *everything*. That is simple, but
//! it turns the collection into a global lock. Here the unit of isolation is the entity
//! itself:
//!
//! - **Ordering**: two requests for the same entity can never interleave. Invariants that
//!   span several fields (status + timestamps + derived sub-states) hold without locks.
//! - **Parallelism**: requests for different entities never contend.
//! - **Atomic commits**: actions run against a working copy; the copy only replaces the
//!   live entity when the action succeeds.
//! - **Optimistic concurrency**: every committed change bumps a version. Callers can
//!   pass the version they last saw and get a [`FrameworkError::Conflict`] if someone
//!   else won the race.
//!
//! ## Module Tour
//!
//! - [`entity`]: the [`ActorEntity`] trait your domain type implements.
//! - [`actor`]: the [`EntityActor`] event loop (the "server" half).
//! - [`client`]: the cloneable [`EntityClient`] handle (the "client" half).
//! - [`message`]: the request envelope sent over the mailbox.
//! - [`observer`]: the [`EntityObserver`] hook used for write-behind persistence.
//! - [`error`]: [`FrameworkError`].
//! - [`tracing`]: subscriber setup shared by binaries and tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (actor, client) = EntityActor::new(order, 32, observer);
//! tokio::spawn(actor.run(context));
//!
//! let outcome = client.perform_action(OrderAction::Cancel { .. }, None).await?;
//! let snapshot = client.snapshot(); // synchronous read of the last committed state
//! ```

pub mod actor;
pub mod client;
pub mod entity;
pub mod error;
pub mod message;
pub mod observer;
pub mod tracing;

pub use actor::EntityActor;
pub use client::EntityClient;
pub use entity::{ActorEntity, Applied, Outcome};
pub use error::FrameworkError;
pub use message::{EntityRequest, Response};
pub use observer::{EntityObserver, NoopObserver};
