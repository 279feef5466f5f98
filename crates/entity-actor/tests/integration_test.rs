use entity_actor::{
    ActorEntity, Applied, EntityActor, EntityObserver, FrameworkError, NoopObserver,
};
use parking_lot::Mutex;
use std::sync::Arc;

// --- Test Entity ---

#[derive(Clone, Debug, PartialEq)]
struct Ticket {
    id: u32,
    stage: u8,
    closed: bool,
    version: u64,
}

#[derive(Debug)]
enum TicketAction {
    Advance,
    Close,
    Touch,
    Fail,
}

#[derive(Debug, thiserror::Error)]
enum TicketError {
    #[error("ticket rejected the action")]
    Rejected,
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

impl ActorEntity for Ticket {
    type Id = u32;
    type Action = TicketAction;
    type Context = ();
    type Error = TicketError;

    fn id(&self) -> &u32 {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn handle_action(&mut self, action: TicketAction, _ctx: &()) -> Result<Applied, TicketError> {
        match action {
            TicketAction::Advance => {
                self.stage += 1;
                Ok(Applied::Changed)
            }
            TicketAction::Close => {
                self.closed = true;
                Ok(Applied::Changed)
            }
            TicketAction::Touch => Ok(Applied::Unchanged),
            TicketAction::Fail => {
                // Mutate the working copy before failing; the commit must not happen.
                self.stage = 99;
                Err(TicketError::Rejected)
            }
        }
    }

    fn on_delete(&self, _ctx: &()) -> Result<bool, TicketError> {
        Ok(self.closed)
    }
}

fn ticket(id: u32) -> Ticket {
    Ticket {
        id,
        stage: 0,
        closed: false,
        version: 0,
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl EntityObserver<Ticket> for RecordingObserver {
    fn on_changed(&self, entity: &Ticket) {
        self.events
            .lock()
            .push(format!("changed:{}:v{}", entity.id, entity.version));
    }

    fn on_removed(&self, id: &u32) {
        self.events.lock().push(format!("removed:{id}"));
    }
}

#[tokio::test]
async fn test_action_commits_and_bumps_version() {
    let (actor, client) = EntityActor::new(ticket(1), 8, Arc::new(NoopObserver));
    tokio::spawn(actor.run(()));

    let outcome = client
        .perform_action(TicketAction::Advance, None)
        .await
        .unwrap();
    assert!(outcome.changed());
    assert_eq!(outcome.entity.stage, 1);
    assert_eq!(outcome.entity.version, 1);

    // Snapshot reads see the committed state without going through the mailbox.
    assert_eq!(client.snapshot(), outcome.entity);
}

#[tokio::test]
async fn test_unchanged_action_keeps_version() {
    let (actor, client) = EntityActor::new(ticket(1), 8, Arc::new(NoopObserver));
    tokio::spawn(actor.run(()));

    let outcome = client.perform_action(TicketAction::Touch, None).await.unwrap();
    assert_eq!(outcome.applied, Applied::Unchanged);
    assert_eq!(outcome.entity.version, 0);
}

#[tokio::test]
async fn test_failed_action_leaves_state_untouched() {
    let (actor, client) = EntityActor::new(ticket(1), 8, Arc::new(NoopObserver));
    tokio::spawn(actor.run(()));

    let result = client.perform_action(TicketAction::Fail, None).await;
    assert!(matches!(result, Err(TicketError::Rejected)));

    let current = client.get().await.unwrap();
    assert_eq!(current.stage, 0);
    assert_eq!(current.version, 0);
}

#[tokio::test]
async fn test_stale_version_is_a_conflict() {
    let (actor, client) = EntityActor::new(ticket(1), 8, Arc::new(NoopObserver));
    tokio::spawn(actor.run(()));

    client
        .perform_action(TicketAction::Advance, Some(0))
        .await
        .unwrap();
    let result = client.perform_action(TicketAction::Advance, Some(0)).await;

    match result {
        Err(TicketError::Framework(FrameworkError::Conflict { expected, found })) => {
            assert_eq!(expected, 0);
            assert_eq!(found, 1);
        }
        other => panic!("Expected conflict, got {other:?}"),
    }
    assert_eq!(client.snapshot().stage, 1);
}

#[tokio::test]
async fn test_concurrent_versioned_writes_have_one_winner() {
    let (actor, client) = EntityActor::new(ticket(1), 64, Arc::new(NoopObserver));
    tokio::spawn(actor.run(()));

    let mut handles = vec![];
    for _ in 0..20 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.perform_action(TicketAction::Advance, Some(0)).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(client.snapshot().stage, 1);
}

#[tokio::test]
async fn test_delete_refused_then_accepted() {
    let observer = Arc::new(RecordingObserver::default());
    let (actor, client) = EntityActor::new(ticket(7), 8, observer.clone());
    let handle = tokio::spawn(actor.run(()));

    assert!(!client.delete().await.unwrap());

    client.perform_action(TicketAction::Close, None).await.unwrap();
    assert!(client.delete().await.unwrap());

    // The actor stops after an accepted delete.
    handle.await.unwrap();
    let after = client.get().await;
    assert!(matches!(
        after,
        Err(TicketError::Framework(FrameworkError::ActorClosed))
    ));

    let events = observer.events.lock().clone();
    assert_eq!(events, vec!["changed:7:v1".to_string(), "removed:7".to_string()]);
}

#[tokio::test]
async fn test_independent_entities_progress_in_parallel() {
    let mut clients = vec![];
    for id in 0..10 {
        let (actor, client) = EntityActor::new(ticket(id), 8, Arc::new(NoopObserver));
        tokio::spawn(actor.run(()));
        clients.push(client);
    }

    let handles: Vec<_> = clients
        .iter()
        .cloned()
        .map(|client| {
            tokio::spawn(async move {
                for _ in 0..5 {
                    client.perform_action(TicketAction::Advance, None).await.unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    for client in &clients {
        let snapshot = client.snapshot();
        assert_eq!(snapshot.stage, 5);
        assert_eq!(snapshot.version, 5);
    }
}
