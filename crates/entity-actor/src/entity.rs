use crate::error::FrameworkError;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any entity must implement to be managed by an [`EntityActor`](crate::EntityActor).
///
/// # Architecture Note
/// The actor owns exactly one value of this type. All mutation goes through
/// [`ActorEntity::handle_action`], which the actor calls on a *working copy*. The copy
/// replaces the live entity only when the hook returns [`Applied::Changed`], so an
/// action that fails halfway never leaves partial state behind.
///
/// Hooks are synchronous on purpose: an entity decides and mutates, it never waits on
/// I/O. Anything slow (persistence, network hand-offs) happens outside the actor.
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The unique identifier for this entity.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// Enum of the operations this entity understands.
    type Action: Send + Debug + 'static;

    /// Runtime dependencies injected into every hook (clocks, policies, ...).
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync + 'static;

    /// The error type for this entity.
    ///
    /// Framework failures (closed mailbox, version conflicts) are folded into it, so
    /// callers deal with a single error enum.
    type Error: std::error::Error + From<FrameworkError> + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;

    /// Current optimistic-concurrency version.
    fn version(&self) -> u64;

    /// Called by the actor after a committed change. Implementations just store it.
    fn set_version(&mut self, version: u64);

    /// Apply an action.
    ///
    /// Return [`Applied::Unchanged`] for requests that are legal but have nothing to do
    /// (duplicate clicks, targets already reached). The actor then skips the version
    /// bump and does not notify observers.
    fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Applied, Self::Error>;

    /// Called when removal is requested. Return `Ok(false)` to refuse it.
    fn on_delete(&self, _ctx: &Self::Context) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Whether an action changed the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
}

/// Result of a successful action: the committed snapshot and whether it changed.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub entity: T,
    pub applied: Applied,
}

impl<T> Outcome<T> {
    pub fn changed(&self) -> bool {
        self.applied == Applied::Changed
    }
}
