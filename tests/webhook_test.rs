mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use storefront_sync::{
    models::{
        order::OrderFilter,
        platform::{OrderStatus, PlatformKind},
        store::NewStore,
    },
    AppState,
};
use tower::ServiceExt;

async fn seed_store(state: &AppState, title: &str, site_id: Option<&str>) -> uuid::Uuid {
    state
        .store_service
        .create(NewStore {
            title: title.to_string(),
            platform: PlatformKind::Webflow,
            platform_site_id: site_id.map(str::to_string),
            oauth_credentials: None,
        })
        .await
        .expect("seed store")
        .id
}

fn new_order_event(site_id: &str, order_id: &str, status: &str) -> JsonValue {
    json!({
        "triggerType": "ecomm_new_order",
        "siteId": site_id,
        "payload": {
            "orderId": order_id,
            "status": status,
            "customerInfo": { "fullName": "Jane Doe", "email": "jane@example.com" },
            "totals": { "total": { "value": 49.99, "unit": "USD" } },
            "acceptedOn": "2024-01-15T10:00:00Z"
        }
    })
}

async fn order_count(state: &AppState) -> i64 {
    state
        .order_service
        .count(&OrderFilter::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn new_order_webhook_creates_canonical_order() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    let store_id = seed_store(&state, "Main shop", Some("site_123")).await;

    let (status, body) = common::send(
        &app,
        "POST",
        "/webhook",
        None,
        Some(new_order_event("site_123", "8d0-665", "unfulfilled")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let order = state
        .order_service
        .find_by_platform_id("webflow", "8d0-665")
        .await
        .unwrap()
        .expect("order stored");
    assert_eq!(order.store_id, Some(store_id));
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::new(4999, 2));
    assert_eq!(order.currency, "USD");
    assert_eq!(order.customer_name.as_deref(), Some("Jane Doe"));
    assert_eq!(order.customer_email.as_deref(), Some("jane@example.com"));
    assert_eq!(order.raw_payload["customerInfo"]["fullName"], "Jane Doe");
}

#[tokio::test]
async fn replayed_webhook_updates_instead_of_duplicating() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    seed_store(&state, "Main shop", Some("site_123")).await;

    let event = new_order_event("site_123", "8d0-665", "unfulfilled");
    common::send(&app, "POST", "/webhook", None, Some(event.clone())).await;
    common::send(&app, "POST", "/webhook", None, Some(event)).await;
    assert_eq!(order_count(&state).await, 1);

    let mut changed = new_order_event("site_123", "8d0-665", "fulfilled");
    changed["triggerType"] = json!("ecomm_order_changed");
    common::send(&app, "POST", "/webhook", None, Some(changed)).await;

    assert_eq!(order_count(&state).await, 1);
    let order = state
        .order_service
        .find_by_platform_id("webflow", "8d0-665")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
}

#[tokio::test]
async fn unresolved_store_is_acknowledged_and_dropped() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);

    let (status, body) = common::send(
        &app,
        "POST",
        "/webhook",
        None,
        Some(new_order_event("site_unknown", "A-1", "pending")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(order_count(&state).await, 0);

    let logs = state.log_service.recent(None, 10).await.unwrap();
    assert!(logs
        .iter()
        .any(|entry| entry.status == "warning"
            && entry.message() == Some("Webhook store could not be resolved")));
}

#[tokio::test]
async fn malformed_and_invalid_payloads_never_fail_the_endpoint() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    seed_store(&state, "Main shop", Some("site_123")).await;

    let req = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let missing_id = json!({
        "triggerType": "ecomm_new_order",
        "siteId": "site_123",
        "payload": { "status": "pending" }
    });
    let (status, _) = common::send(&app, "POST", "/webhook", None, Some(missing_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order_count(&state).await, 0);

    // A later valid event still goes through.
    common::send(
        &app,
        "POST",
        "/webhook",
        None,
        Some(new_order_event("site_123", "B-2", "pending")),
    )
    .await;
    assert_eq!(order_count(&state).await, 1);
}

#[tokio::test]
async fn existing_order_resolves_store_before_fallback() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    let first = seed_store(&state, "First", Some("site_first")).await;
    let owner = seed_store(&state, "Owner", Some("site_owner")).await;

    common::send(
        &app,
        "POST",
        "/webhook",
        None,
        Some(new_order_event("site_owner", "C-3", "pending")),
    )
    .await;

    // Site id no longer matches anything; the stored order still points at its store.
    let mut changed = new_order_event("site_renamed", "C-3", "fulfilled");
    changed["triggerType"] = json!("ecomm_order_changed");
    common::send(&app, "POST", "/webhook", None, Some(changed)).await;

    let order = state
        .order_service
        .find_by_platform_id("webflow", "C-3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.store_id, Some(owner));
    assert_ne!(order.store_id, Some(first));
    assert_eq!(order.status(), OrderStatus::Completed);
}

#[tokio::test]
async fn unknown_site_falls_back_to_first_store_with_site() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    seed_store(&state, "No site yet", None).await;
    let with_site = seed_store(&state, "Has site", Some("site_real")).await;

    common::send(
        &app,
        "POST",
        "/webhook",
        None,
        Some(new_order_event("site_other", "D-4", "pending")),
    )
    .await;

    let order = state
        .order_service
        .find_by_platform_id("webflow", "D-4")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.store_id, Some(with_site));

    let logs = state.log_service.recent(Some(with_site), 10).await.unwrap();
    assert!(logs
        .iter()
        .any(|entry| entry.message() == Some("Webhook attributed to store by platform fallback")));
}

#[tokio::test]
async fn inventory_and_unknown_events_are_acknowledged() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    seed_store(&state, "Main shop", Some("site_123")).await;

    for trigger in ["ecomm_inventory_changed", "site_publish"] {
        let (status, body) = common::send(
            &app,
            "POST",
            "/webhook",
            None,
            Some(json!({ "triggerType": trigger, "siteId": "site_123", "payload": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
    assert_eq!(order_count(&state).await, 0);
}

#[tokio::test]
async fn snake_case_envelope_and_other_platforms_are_accepted() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    let store = state
        .store_service
        .create(NewStore {
            title: "Cart shop".to_string(),
            platform: PlatformKind::Cart,
            platform_site_id: Some("shop-9".to_string()),
            oauth_credentials: None,
        })
        .await
        .unwrap();

    let event = json!({
        "event_type": "new_order",
        "site_id": "shop-9",
        "platform": "cart",
        "payload": {
            "id": 1001,
            "financial_status": "paid",
            "currency": "eur",
            "total_price": "120.50",
            "customer": { "first_name": "Ann", "last_name": "Lee", "email": "ann@example.com" }
        }
    });
    common::send(&app, "POST", "/webhook", None, Some(event)).await;

    let order = state
        .order_service
        .find_by_platform_id("cart", "1001")
        .await
        .unwrap()
        .expect("cart order stored");
    assert_eq!(order.store_id, Some(store.id));
    assert_eq!(order.status(), OrderStatus::Processing);
    assert_eq!(order.currency, "EUR");
    assert_eq!(order.total_amount, Decimal::new(12050, 2));
    assert_eq!(order.customer_name.as_deref(), Some("Ann Lee"));
}

#[tokio::test]
async fn site_owned_by_a_store_cannot_be_claimed_by_a_new_one() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    let owner = seed_store(&state, "Owner", Some("site_1")).await;

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/stores",
        Some(&common::bearer("operator-1")),
        Some(json!({ "title": "Copycat", "platform": "webflow", "platform_site_id": "site_1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(state.store_service.list().await.unwrap().len(), 1);

    common::send(
        &app,
        "POST",
        "/webhook",
        None,
        Some(new_order_event("site_1", "E-5", "pending")),
    )
    .await;
    let order = state
        .order_service
        .find_by_platform_id("webflow", "E-5")
        .await
        .unwrap()
        .expect("order stored");
    assert_eq!(order.store_id, Some(owner));
}
