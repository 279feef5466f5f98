use crate::entity::{ActorEntity, Outcome};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T, E> = oneshot::Sender<Result<T, E>>;

/// Internal message type sent to an [`EntityActor`](crate::EntityActor).
///
/// There is no `Create`: an actor is born holding its entity, so creation is the
/// caller spawning a new actor. The remaining operations are the ones that must be
/// serialized against the entity's state.
///
/// - **Get**: Fetches the current committed state.
/// - **Action**: Runs [`ActorEntity::handle_action`], optionally guarded by the version
///   the caller last observed.
/// - **Delete**: Asks [`ActorEntity::on_delete`]; on acceptance the actor stops.
#[derive(Debug)]
pub enum EntityRequest<T: ActorEntity> {
    Get {
        respond_to: oneshot::Sender<T>,
    },
    Action {
        action: T::Action,
        expected_version: Option<u64>,
        respond_to: Response<Outcome<T>, T::Error>,
    },
    Delete {
        respond_to: Response<bool, T::Error>,
    },
}
