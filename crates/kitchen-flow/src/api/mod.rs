//! Orders API Module
//!
//! REST surface over [`OrderStore`] and [`IntegrationSyncTracker`], mounted under `/api`.

pub mod error;
pub mod handler;

use crate::store::OrderStore;
use crate::sync_tracker::IntegrationSyncTracker;
use crate::urgency::{UrgencyPolicy, UrgencyReport};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: OrderStore,
    pub tracker: IntegrationSyncTracker,
    pub policy: UrgencyPolicy,
    pub urgency: watch::Receiver<UrgencyReport>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(handler::list).post(handler::create))
        .route(
            "/orders/{id}",
            get(handler::get_by_id).delete(handler::delete),
        )
        .route("/orders/{id}/kitchen-status", post(handler::set_kitchen_status))
        .route("/orders/{id}/deliver", post(handler::mark_as_delivered))
        .route("/orders/{id}/send-to-delivery", post(handler::send_to_delivery))
        .route("/orders/{id}/delivery-status", post(handler::set_delivery_status))
        .route("/orders/{id}/courier", post(handler::assign_courier))
        .route("/orders/{id}/cancel", post(handler::cancel))
        .route("/orders/{id}/sync/retry", post(handler::retry_sync))
        .route("/boards/kitchen", get(handler::kitchen_board))
        .route("/boards/delivery", get(handler::delivery_board))
        .route("/urgency", get(handler::urgency))
        .route("/health", get(handler::health))
}
