use crate::entity::{ActorEntity, Outcome};
use crate::error::FrameworkError;
use crate::message::EntityRequest;
use tokio::sync::{mpsc, oneshot, watch};

/// ## EntityClient
///
/// The `EntityClient<T>` is the handle to one running [`EntityActor`](crate::EntityActor).
/// It forwards requests over the actor's mailbox and awaits replies on oneshot channels.
///
/// * **Cloneable**: holds a sender and a snapshot receiver, so cloning is cheap.
/// * **Synchronous reads**: [`EntityClient::snapshot`] reads the last committed state
///   without a round trip through the mailbox.
/// * **Typed errors**: every call returns the entity's own error type; framework
///   failures arrive through its `From<FrameworkError>` conversion.
pub struct EntityClient<T: ActorEntity> {
    sender: mpsc::Sender<EntityRequest<T>>,
    snapshot: watch::Receiver<T>,
}

impl<T: ActorEntity> Clone for EntityClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<T: ActorEntity> EntityClient<T> {
    pub fn new(sender: mpsc::Sender<EntityRequest<T>>, snapshot: watch::Receiver<T>) -> Self {
        Self { sender, snapshot }
    }

    /// Last committed state. Never blocks on the actor.
    pub fn snapshot(&self) -> T {
        self.snapshot.borrow().clone()
    }

    /// `true` once the actor has stopped (for example after an accepted delete).
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn get(&self) -> Result<T, T::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EntityRequest::Get { respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        Ok(response.await.map_err(|_| FrameworkError::ActorDropped)?)
    }

    pub async fn perform_action(
        &self,
        action: T::Action,
        expected_version: Option<u64>,
    ) -> Result<Outcome<T>, T::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EntityRequest::Action {
                action,
                expected_version,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn delete(&self) -> Result<bool, T::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EntityRequest::Delete { respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}
