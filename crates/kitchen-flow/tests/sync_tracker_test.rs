use kitchen_flow::clock::ManualClock;
use kitchen_flow::model::{Channel, ItemDraft, Order, OrderDraft, OrderType, SyncStatus};
use kitchen_flow::order_actor::OrderError;
use kitchen_flow::store::{MemoryStorage, OrderStore, StoreOptions};
use kitchen_flow::sync_tracker::{
    IntegrationSyncTracker, MockTransport, SyncPass, SyncWorker, TransportError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn setup() -> (OrderStore, IntegrationSyncTracker, MockTransport) {
    let store = OrderStore::open(
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::default()),
        StoreOptions::default(),
    )
    .await
    .unwrap();
    let transport = MockTransport::new();
    let tracker = IntegrationSyncTracker::new(store.clone(), Arc::new(transport.clone()));
    (store, tracker, transport)
}

fn draft(channel: Channel) -> OrderDraft {
    let mut draft = OrderDraft::new(
        OrderType::ParaLlevar,
        vec![ItemDraft::new("Salchipapa", 1, Some(15.0))],
    );
    draft.channel = channel;
    if channel.is_external() {
        draft.external_order_id = Some(format!("{channel}-77"));
    }
    draft
}

fn sync_status(order: &Order) -> Option<SyncStatus> {
    order.integration.as_ref().map(|i| i.sync_status)
}

#[tokio::test]
async fn test_external_orders_start_pending_and_odin_orders_untracked() {
    let (store, tracker, _) = setup().await;
    let web = store.create_order(draft(Channel::Web)).await.unwrap();
    let odin = store.create_order(draft(Channel::Odin)).await.unwrap();

    assert_eq!(sync_status(&web), Some(SyncStatus::Pending));
    assert_eq!(odin.integration, None);

    let pending: Vec<_> = tracker.pending().iter().map(|o| o.id).collect();
    assert_eq!(pending, vec![web.id]);

    assert!(matches!(
        tracker.retry(odin.id).await,
        Err(OrderError::IllegalTransition { .. })
    ));
    assert!(matches!(
        tracker.report_synced(odin.id).await,
        Err(OrderError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn test_sync_pass_records_transport_results() {
    let (store, tracker, transport) = setup().await;
    let pos = store.create_order(draft(Channel::PosExterno)).await.unwrap();
    let mobile = store.create_order(draft(Channel::Mobile)).await.unwrap();

    transport.expect_push(pos.id).return_ok();
    transport
        .expect_push(mobile.id)
        .return_err(TransportError::Unreachable(Channel::Mobile));

    let pass = tracker.sync_pending().await;
    assert_eq!(
        pass,
        SyncPass {
            attempted: 2,
            synced: 1,
            failed: 1
        }
    );
    transport.verify();

    let pos = store.get(pos.id).unwrap();
    assert_eq!(sync_status(&pos), Some(SyncStatus::Synced));
    assert!(pos.integration.as_ref().unwrap().last_sync_at.is_some());

    let mobile = store.get(mobile.id).unwrap();
    assert_eq!(sync_status(&mobile), Some(SyncStatus::Failed));
    assert_eq!(
        mobile.integration.as_ref().unwrap().failed_reason.as_deref(),
        Some("MOBILE is unreachable")
    );

    // FAILED orders are not picked up again without an explicit retry.
    assert_eq!(tracker.sync_pending().await, SyncPass::default());
    assert_eq!(tracker.failed().len(), 1);
    transport.verify();
}

#[tokio::test]
async fn test_retry_only_from_failed() {
    let (store, tracker, _) = setup().await;
    let order = store.create_order(draft(Channel::Api)).await.unwrap();

    // Already PENDING: nothing to do.
    let unchanged = tracker.retry(order.id).await.unwrap();
    assert_eq!(unchanged, order);

    tracker.report_synced(order.id).await.unwrap();
    assert!(matches!(
        tracker.retry(order.id).await,
        Err(OrderError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn test_failed_report_needs_reason() {
    let (store, tracker, _) = setup().await;
    let order = store.create_order(draft(Channel::Web)).await.unwrap();
    assert!(matches!(
        tracker.report_failed(order.id, "  ").await,
        Err(OrderError::Validation(_))
    ));

    let failed = tracker.report_failed(order.id, "HTTP 502").await.unwrap();
    assert_eq!(sync_status(&failed), Some(SyncStatus::Failed));
    let retried = tracker.retry(failed.id).await.unwrap();
    assert_eq!(sync_status(&retried), Some(SyncStatus::Pending));
    assert_eq!(retried.integration.unwrap().failed_reason, None);
}

#[tokio::test]
async fn test_canceled_orders_still_sync() {
    let (store, tracker, transport) = setup().await;
    let order = store.create_order(draft(Channel::Web)).await.unwrap();
    store.cancel_order(order.id, "sin stock").await.unwrap();

    transport.expect_push(order.id).return_ok();
    let pass = tracker.sync_pending().await;
    assert_eq!(pass.synced, 1);
    transport.verify();

    let order = store.get(order.id).unwrap();
    assert!(order.is_canceled());
    assert_eq!(sync_status(&order), Some(SyncStatus::Synced));
}

#[tokio::test]
async fn test_worker_is_woken_by_retry() {
    let (store, tracker, transport) = setup().await;
    let order = store.create_order(draft(Channel::Web)).await.unwrap();
    tracker.report_failed(order.id, "timeout").await.unwrap();

    let shutdown = CancellationToken::new();
    let worker = SyncWorker::new(tracker.clone(), Duration::from_secs(3600), shutdown.clone());
    let handle = tokio::spawn(worker.run());

    transport.expect_push(order.id).return_ok();
    tracker.retry(order.id).await.unwrap();

    let synced = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let current = store.get(order.id).unwrap();
            if sync_status(&current) == Some(SyncStatus::Synced) {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker did not push the retried order");
    assert!(synced.integration.unwrap().last_sync_at.is_some());

    shutdown.cancel();
    handle.await.unwrap();
    transport.verify();
    assert_eq!(transport.pushed(), vec![order.id]);
}

#[tokio::test]
async fn test_cancel_requeues_synced_order_for_push() {
    let (store, tracker, transport) = setup().await;
    let order = store.create_order(draft(Channel::PosExterno)).await.unwrap();
    transport.expect_push(order.id).return_ok();
    assert_eq!(tracker.sync_pending().await.synced, 1);

    let canceled = store.cancel_order(order.id, "cliente no recogió").await.unwrap();
    assert_eq!(sync_status(&canceled), Some(SyncStatus::Pending));

    transport.expect_push(order.id).return_ok();
    assert_eq!(tracker.sync_pending().await.synced, 1);
    transport.verify();
    assert_eq!(transport.pushed(), vec![order.id, order.id]);

    let order = store.get(order.id).unwrap();
    assert!(order.is_canceled());
    assert_eq!(sync_status(&order), Some(SyncStatus::Synced));
}

#[tokio::test]
async fn test_cancel_leaves_failed_sync_for_operator() {
    let (store, tracker, _) = setup().await;
    let order = store.create_order(draft(Channel::Web)).await.unwrap();
    tracker.report_failed(order.id, "HTTP 503").await.unwrap();

    let canceled = store.cancel_order(order.id, "sin stock").await.unwrap();
    assert_eq!(sync_status(&canceled), Some(SyncStatus::Failed));
    assert!(tracker.pending().is_empty());
}
