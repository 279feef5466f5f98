//! Order API Handlers
//!
//! Every mutating endpoint returns the updated order. Repeated requests whose target is
//! already reached (double clicks) answer 200 with the unchanged order.
//!
//! Mutations accept an optional `If-Match: <version>` header. When present, the change
//! only applies if the order is still at that version; otherwise the answer is 409.

use super::error::bad_body;
use super::AppState;
use crate::clock::Clock;
use crate::model::{Channel, DeliveryStatus, KitchenStatus, Order, OrderDraft, OrderId};
use crate::order_actor::{OrderAction, OrderError};
use crate::store::{OrderFilter, PersistenceHealth};
use crate::transitions::Transition;
use crate::urgency::UrgencyReport;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const CHANNEL_HEADER: &str = "x-order-channel";

type ApiResult<T> = Result<T, OrderError>;
type Body<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
pub struct StatusBody<S> {
    pub status: S,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierBody {
    pub courier_id: String,
    pub courier_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Board row: the order plus its urgency at read time.
#[derive(Debug, Serialize)]
pub struct BoardEntry {
    #[serde(flatten)]
    pub order: Order,
    pub urgent: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub orders: usize,
    pub persistence: PersistenceHealth,
}

fn parse_id(raw: &str) -> ApiResult<OrderId> {
    raw.parse().map_err(OrderError::Validation)
}

fn expected_version(headers: &HeaderMap) -> ApiResult<Option<u64>> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .map(|v| v.trim().trim_matches('"'))
        .and_then(|v| v.parse().ok())
        .map(Some)
        .ok_or_else(|| OrderError::validation("If-Match must be an order version number"))
}

async fn perform(
    state: &AppState,
    raw_id: &str,
    headers: &HeaderMap,
    action: OrderAction,
) -> ApiResult<Json<Order>> {
    let id = parse_id(raw_id)?;
    let version = expected_version(headers)?;
    let outcome = state.store.apply(id, action, version).await?;
    Ok(Json(outcome.entity))
}

/// POST /api/orders - Create an order
///
/// The `X-Order-Channel` header tags the originating channel (default ODIN).
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body<OrderDraft>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let Json(mut draft) = body.map_err(bad_body)?;
    if let Some(value) = headers.get(CHANNEL_HEADER) {
        draft.channel = value
            .to_str()
            .map_err(|_| OrderError::validation("X-Order-Channel is not valid text"))?
            .parse::<Channel>()
            .map_err(OrderError::Validation)?;
    }
    let order = state.store.create_order(draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders - List orders, oldest first
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Json<Vec<Order>> {
    Json(state.store.list(&filter))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.store.get(parse_id(&id)?)?))
}

/// DELETE /api/orders/{id} - Only handed-off or canceled orders are removed
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.store.delete_order(parse_id(&id)?).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /api/orders/{id}/kitchen-status
pub async fn set_kitchen_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body<StatusBody<KitchenStatus>>,
) -> ApiResult<Json<Order>> {
    let Json(body) = body.map_err(bad_body)?;
    perform(&state, &id, &headers, Transition::Kitchen(body.status).into()).await
}

/// POST /api/orders/{id}/deliver - MESA / PARA_LLEVAR leave the kitchen
pub async fn mark_as_delivered(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Order>> {
    perform(&state, &id, &headers, Transition::MarkDelivered.into()).await
}

/// POST /api/orders/{id}/send-to-delivery
pub async fn send_to_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Order>> {
    perform(&state, &id, &headers, Transition::SendToDelivery.into()).await
}

/// POST /api/orders/{id}/delivery-status
pub async fn set_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body<StatusBody<DeliveryStatus>>,
) -> ApiResult<Json<Order>> {
    let Json(body) = body.map_err(bad_body)?;
    perform(&state, &id, &headers, Transition::Delivery(body.status).into()).await
}

/// POST /api/orders/{id}/courier
pub async fn assign_courier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body<CourierBody>,
) -> ApiResult<Json<Order>> {
    let Json(body) = body.map_err(bad_body)?;
    let transition = Transition::AssignCourier {
        courier_id: body.courier_id,
        courier_name: body.courier_name,
    };
    perform(&state, &id, &headers, transition.into()).await
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body<CancelBody>,
) -> ApiResult<Json<Order>> {
    let Json(body) = body.map_err(bad_body)?;
    let transition = Transition::Cancel {
        reason: body.reason,
    };
    perform(&state, &id, &headers, transition.into()).await
}

/// POST /api/orders/{id}/sync/retry - FAILED back to PENDING
pub async fn retry_sync(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.tracker.retry(parse_id(&id)?).await?))
}

/// GET /api/boards/kitchen
pub async fn kitchen_board(State(state): State<AppState>) -> Json<Vec<BoardEntry>> {
    let now = state.store.clock().now();
    let entries = state
        .store
        .list(&OrderFilter::kitchen_board())
        .into_iter()
        .map(|order| BoardEntry {
            urgent: state.policy.kitchen_urgent(&order, now),
            order,
        })
        .collect();
    Json(entries)
}

/// GET /api/boards/delivery
pub async fn delivery_board(State(state): State<AppState>) -> Json<Vec<BoardEntry>> {
    let now = state.store.clock().now();
    let entries = state
        .store
        .list(&OrderFilter::delivery_board())
        .into_iter()
        .map(|order| BoardEntry {
            urgent: state.policy.delivery_urgent(&order, now),
            order,
        })
        .collect();
    Json(entries)
}

/// GET /api/urgency - Last report published by the urgency ticker
pub async fn urgency(State(state): State<AppState>) -> Json<UrgencyReport> {
    Json(state.urgency.borrow().clone())
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let persistence = state.store.persistence_health();
    Json(HealthResponse {
        status: if persistence.is_healthy() {
            "ok"
        } else {
            "degraded"
        },
        orders: state.store.len(),
        persistence,
    })
}
