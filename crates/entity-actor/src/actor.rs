use crate::client::EntityClient;
use crate::entity::{ActorEntity, Applied, Outcome};
use crate::error::FrameworkError;
use crate::message::EntityRequest;
use crate::observer::EntityObserver;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// The actor that owns a single entity.
///
/// # Architecture Note
/// This struct is the "Server" half. It owns the entity, the receiver end of the
/// mailbox and the sender end of the snapshot channel.
///
/// **Concurrency Model**:
/// One `EntityActor` per entity, each in its own Tokio task. Messages for one entity are
/// processed *sequentially*, so the entity needs no `Mutex`; different entities never
/// share anything.
///
/// # Operations
///
/// * **Get**: returns a clone of the committed entity.
/// * **Action**:
///     1. Rejects with [`FrameworkError::Conflict`] if `expected_version` is stale.
///     2. Runs `handle_action` on a working copy.
///     3. On [`Applied::Changed`]: bumps the version, commits the copy, publishes the
///        snapshot and notifies the observer.
///     4. On [`Applied::Unchanged`] or error: the live entity is untouched.
/// * **Delete**: asks `on_delete`; on acceptance notifies the observer and stops the loop.
pub struct EntityActor<T: ActorEntity> {
    receiver: mpsc::Receiver<EntityRequest<T>>,
    entity: T,
    snapshot: watch::Sender<T>,
    observer: Arc<dyn EntityObserver<T>>,
}

impl<T: ActorEntity> EntityActor<T> {
    /// Creates a new `EntityActor` holding `entity` and its associated `EntityClient`.
    ///
    /// `buffer_size` is the mailbox capacity. When it is full, client calls wait for space.
    pub fn new(
        entity: T,
        buffer_size: usize,
        observer: Arc<dyn EntityObserver<T>>,
    ) -> (Self, EntityClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (snapshot, snapshot_rx) = watch::channel(entity.clone());
        let actor = Self {
            receiver,
            entity,
            snapshot,
            observer,
        };
        let client = EntityClient::new(sender, snapshot_rx);
        (actor, client)
    }

    /// Runs the actor's event loop until the mailbox closes or the entity is deleted.
    pub async fn run(mut self, context: T::Context) {
        // Extract just the type name (e.g., "Order" instead of "kitchen_flow::model::order::Order")
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        let id = self.entity.id().clone();
        debug!(entity_type, %id, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                EntityRequest::Get { respond_to } => {
                    let _ = respond_to.send(self.entity.clone());
                }
                EntityRequest::Action {
                    action,
                    expected_version,
                    respond_to,
                } => {
                    let found = self.entity.version();
                    if let Some(expected) = expected_version {
                        if expected != found {
                            warn!(entity_type, %id, expected, found, "Stale version");
                            let err = FrameworkError::Conflict { expected, found };
                            let _ = respond_to.send(Err(err.into()));
                            continue;
                        }
                    }

                    debug!(entity_type, %id, ?action, "Action");
                    let mut working = self.entity.clone();
                    let result = match working.handle_action(action, &context) {
                        Ok(Applied::Changed) => {
                            working.set_version(found + 1);
                            self.entity = working;
                            self.snapshot.send_replace(self.entity.clone());
                            self.observer.on_changed(&self.entity);
                            info!(entity_type, %id, version = found + 1, "Action applied");
                            Ok(Outcome {
                                entity: self.entity.clone(),
                                applied: Applied::Changed,
                            })
                        }
                        Ok(Applied::Unchanged) => {
                            debug!(entity_type, %id, "Action absorbed");
                            Ok(Outcome {
                                entity: self.entity.clone(),
                                applied: Applied::Unchanged,
                            })
                        }
                        Err(e) => {
                            warn!(entity_type, %id, error = %e, "Action failed");
                            Err(e)
                        }
                    };
                    let _ = respond_to.send(result);
                }
                EntityRequest::Delete { respond_to } => match self.entity.on_delete(&context) {
                    Ok(true) => {
                        self.observer.on_removed(&id);
                        info!(entity_type, %id, "Deleted");
                        let _ = respond_to.send(Ok(true));
                        break;
                    }
                    Ok(false) => {
                        debug!(entity_type, %id, "Delete refused");
                        let _ = respond_to.send(Ok(false));
                    }
                    Err(e) => {
                        warn!(entity_type, %id, error = %e, "on_delete failed");
                        let _ = respond_to.send(Err(e));
                    }
                },
            }
        }

        debug!(entity_type, %id, "Shutdown");
    }
}
