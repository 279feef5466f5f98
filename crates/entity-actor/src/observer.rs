//! Change notifications out of the actor.
//!
//! The actor calls the observer after every committed change and after an accepted
//! removal, in mailbox order. Observers must return quickly: typically they forward the
//! snapshot to another task (a persistence journal, a broadcast bus) over an unbounded
//! channel.

use crate::entity::ActorEntity;

pub trait EntityObserver<T: ActorEntity>: Send + Sync + 'static {
    fn on_changed(&self, entity: &T);

    fn on_removed(&self, id: &T::Id);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl<T: ActorEntity> EntityObserver<T> for NoopObserver {
    fn on_changed(&self, _entity: &T) {}

    fn on_removed(&self, _id: &T::Id) {}
}
