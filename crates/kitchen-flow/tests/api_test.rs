use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use kitchen_flow::clock::ManualClock;
use kitchen_flow::config::Config;
use kitchen_flow::lifecycle::KitchenSystem;
use kitchen_flow::store::MemoryStorage;
use kitchen_flow::sync_tracker::MockTransport;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn start() -> (KitchenSystem, Router, ManualClock) {
    let clock = ManualClock::default();
    let config = Config {
        sync_poll: std::time::Duration::from_secs(3600),
        ..Config::default()
    };
    let system = KitchenSystem::start(
        &config,
        Arc::new(MemoryStorage::new()),
        Arc::new(MockTransport::new()),
        Arc::new(clock.clone()),
    )
    .await
    .unwrap();
    let router = system.router();
    (system, router, clock)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn mesa_body() -> Value {
    json!({
        "type": "MESA",
        "tableNumber": 3,
        "items": [
            { "name": "Seco de res", "qty": 1, "price": 30.0 },
            { "name": "Limonada", "qty": 2, "price": 5.0 }
        ]
    })
}

fn delivery_body() -> Value {
    json!({
        "type": "DELIVERY",
        "items": [{ "name": "Pollo broaster", "qty": 1, "price": 20.0 }],
        "delivery": { "address": "Av. Brasil 1500" }
    })
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, order) = send(app, Method::POST, "/api/orders", &[], Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    order
}

#[tokio::test]
async fn test_create_and_serve_mesa_order() {
    let (system, app, _) = start().await;
    let order = create(&app, mesa_body()).await;
    assert_eq!(order["orderNumber"], "ORD-0001");
    assert_eq!(order["kitchenStatus"], "NUEVA");
    assert_eq!(order["total"], 40.0);
    assert!(order.get("integration").is_none());

    for status in ["PREPARANDO", "LISTA"] {
        let (code, body) = send(
            &app,
            Method::POST,
            "/api/orders/1/kitchen-status",
            &[],
            Some(json!({ "status": status })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["kitchenStatus"], status);
    }
    let (code, body) = send(&app, Method::POST, "/api/orders/order_1/deliver", &[], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["kitchenStatus"], "ENTREGADA");
    assert!(body["handedOffAt"].is_string());

    let (code, body) = send(&app, Method::GET, "/api/orders/1", &[], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["version"], 3);
    system.shutdown().await;
}

#[tokio::test]
async fn test_error_kinds_map_to_status_codes() {
    let (system, app, _) = start().await;
    create(&app, delivery_body()).await;

    let (code, body) = send(
        &app,
        Method::POST,
        "/api/orders/1/cancel",
        &[],
        Some(json!({ "reason": "" })),
    )
    .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "ValidationError");

    let (code, body) = send(&app, Method::GET, "/api/orders/99", &[], None).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFoundError");

    let (code, body) = send(&app, Method::GET, "/api/orders/abc", &[], None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "ValidationError");

    let (code, body) = send(
        &app,
        Method::POST,
        "/api/orders/1/delivery-status",
        &[],
        Some(json!({ "status": "EN_RUTA" })),
    )
    .await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "IllegalTransitionError");
    assert!(body["message"].as_str().unwrap().contains("order_1"));

    let (code, body) = send(
        &app,
        Method::POST,
        "/api/orders/1/kitchen-status",
        &[],
        Some(json!({ "status": "QUEMADA" })),
    )
    .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "ValidationError");
    system.shutdown().await;
}

#[tokio::test]
async fn test_if_match_enables_optimistic_check() {
    let (system, app, _) = start().await;
    create(&app, mesa_body()).await;

    let (code, body) = send(
        &app,
        Method::POST,
        "/api/orders/1/kitchen-status",
        &[("if-match", "0")],
        Some(json!({ "status": "PREPARANDO" })),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["version"], 1);

    let (code, body) = send(
        &app,
        Method::POST,
        "/api/orders/1/cancel",
        &[("if-match", "\"0\"")],
        Some(json!({ "reason": "mesa se retiró" })),
    )
    .await;
    assert_eq!(code, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "ConflictError");

    let (code, _) = send(
        &app,
        Method::POST,
        "/api/orders/1/cancel",
        &[("if-match", "uno")],
        Some(json!({ "reason": "mesa se retiró" })),
    )
    .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    system.shutdown().await;
}

#[tokio::test]
async fn test_channel_header_tags_external_orders() {
    let (system, app, _) = start().await;
    let (code, order) = send(
        &app,
        Method::POST,
        "/api/orders",
        &[("x-order-channel", "POS_EXTERNO")],
        Some(json!({
            "type": "PARA_LLEVAR",
            "items": [{ "name": "Chicharrón", "qty": 1 }],
            "externalOrderId": "pos-4411"
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(order["integration"]["channel"], "POS_EXTERNO");
    assert_eq!(order["integration"]["syncStatus"], "PENDING");
    assert_eq!(order["integration"]["externalOrderId"], "pos-4411");

    let (code, body) = send(
        &app,
        Method::POST,
        "/api/orders",
        &[("x-order-channel", "FAX")],
        Some(mesa_body()),
    )
    .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "ValidationError");
    system.shutdown().await;
}

#[tokio::test]
async fn test_boards_flag_urgency_at_read_time() {
    let (system, app, clock) = start().await;
    create(&app, mesa_body()).await;
    create(&app, delivery_body()).await;

    let (_, board) = send(&app, Method::GET, "/api/boards/kitchen", &[], None).await;
    let board = board.as_array().unwrap().clone();
    assert_eq!(board.len(), 2);
    assert!(board.iter().all(|entry| entry["urgent"] == false));

    clock.advance(Duration::minutes(16));
    let (_, board) = send(&app, Method::GET, "/api/boards/kitchen", &[], None).await;
    assert!(board
        .as_array()
        .unwrap()
        .iter()
        .all(|entry| entry["urgent"] == true));

    for status in ["PREPARANDO", "LISTA"] {
        send(
            &app,
            Method::POST,
            "/api/orders/2/kitchen-status",
            &[],
            Some(json!({ "status": status })),
        )
        .await;
    }
    let (_, delivery) = send(&app, Method::GET, "/api/boards/delivery", &[], None).await;
    let delivery = delivery.as_array().unwrap().clone();
    assert_eq!(delivery.len(), 1);
    assert_eq!(delivery[0]["deliveryStatus"], "PENDIENTE_ASIGNAR");
    assert_eq!(delivery[0]["urgent"], false);

    clock.advance(Duration::minutes(5));
    let (_, delivery) = send(&app, Method::GET, "/api/boards/delivery", &[], None).await;
    assert_eq!(delivery[0]["urgent"], true);

    let (code, courier) = send(
        &app,
        Method::POST,
        "/api/orders/2/courier",
        &[],
        Some(json!({ "courierId": "c1", "courierName": "Carlos Ramírez" })),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(courier["deliveryStatus"], "EN_RUTA");
    assert_eq!(courier["delivery"]["courierName"], "Carlos Ramírez");
    system.shutdown().await;
}

#[tokio::test]
async fn test_delete_list_and_health() {
    let (system, app, _) = start().await;
    create(&app, mesa_body()).await;
    create(&app, delivery_body()).await;

    let (code, body) = send(&app, Method::DELETE, "/api/orders/1", &[], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body, json!({ "deleted": false }));

    send(
        &app,
        Method::POST,
        "/api/orders/1/cancel",
        &[],
        Some(json!({ "reason": "cliente canceló" })),
    )
    .await;
    let (_, body) = send(&app, Method::DELETE, "/api/orders/1", &[], None).await;
    assert_eq!(body, json!({ "deleted": true }));

    let (code, list) = send(&app, Method::GET, "/api/orders?type=DELIVERY", &[], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["orderNumber"], "ORD-0002");

    let (_, all) = send(&app, Method::GET, "/api/orders", &[], None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (code, health) = send(&app, Method::GET, "/api/health", &[], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["orders"], 1);

    let (code, urgency) = send(&app, Method::GET, "/api/urgency", &[], None).await;
    assert_eq!(code, StatusCode::OK);
    assert!(urgency["kitchen"].is_array());
    system.shutdown().await;
}

#[tokio::test]
async fn test_sync_retry_endpoint() {
    let (system, app, _) = start().await;
    let odin = create(&app, mesa_body()).await;
    let (code, body) = send(
        &app,
        Method::POST,
        &format!("/api/orders/{}/sync/retry", odin["id"]),
        &[],
        None,
    )
    .await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "IllegalTransitionError");
    system.shutdown().await;
}
