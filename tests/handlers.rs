//! HTTP surface tests through the assembled router: auth gating, the public
//! storefront, checkout, and the dev bootstrap path.

mod common;
use common::*;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_router(app: &TestApp) -> Router {
    sellio::app(app.state.clone(), true)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_post_json(uri: &str, api_key: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {api_key}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("valid JSON body")
}

#[tokio::test]
async fn health_answers_ok() {
    let app = test_app();
    let router = test_router(&app);

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn creator_routes_require_a_valid_api_key() {
    let app = test_app();
    let router = test_router(&app);
    let (_, api_key) = {
        let conn = app.db().get().unwrap();
        create_test_creator(&conn, "auth@example.com")
    };

    let response = router
        .clone()
        .oneshot(get("/creators/products"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/creators/products")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/creators/products")
                .header("authorization", format!("Bearer {api_key}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn dev_bootstrap_then_create_product() {
    let app = test_app();
    let router = test_router(&app);

    let response = router
        .clone()
        .oneshot(post_json(
            "/dev/creators",
            json!({
                "email": "boot@example.com",
                "store_name": "Bootstrap store",
                "promptpay_id": "0899999999",
                "publish": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let api_key = created["api_key"].as_str().unwrap().to_string();
    assert_eq!(created["is_published"], true);

    let response = router
        .oneshot(authed_post_json(
            "/creators/products",
            &api_key,
            json!({
                "name": "Portrait session",
                "product_type": "booking",
                "price": 200_000,
                "duration_minutes": 90
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let product = body_json(response).await;
    assert_eq!(product["product_type"], "booking");
    assert_eq!(product["is_published"], false);
}

#[tokio::test]
async fn storefront_lists_offerable_slots_grouped_by_date() {
    let app = test_app();
    let router = test_router(&app);
    let (creator, product, slot_id) = {
        let mut conn = app.db().get().unwrap();
        let (creator, _) = create_test_creator(&conn, "store@example.com");
        let product = create_booking_product(&conn, &creator.id);
        let open = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
        let full = add_slot(&mut conn, &product, future_date(), time(11, 0), 1);
        place_order(&mut conn, &product, Some(&full.id), "rival@example.com");
        (creator, product, open.id)
    };

    let response = router
        .oneshot(get(&format!(
            "/stores/{}/products/{}/slots",
            creator.id, product.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let days = body_json(response).await;
    let days = days.as_array().unwrap();
    assert_eq!(days.len(), 1);
    let slots = days[0]["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["id"], slot_id);
    assert_eq!(slots[0]["seats_left"], 1);
}

#[tokio::test]
async fn availability_reflects_recurrence_advance_notice_and_buffer() {
    let app = test_app();
    let router = test_router(&app);
    let (creator, product, today, busy_day) = {
        let mut conn = app.db().get().unwrap();
        let (creator, _) = create_test_creator(&conn, "rules@example.com");
        let product = create_booking_product(&conn, &creator.id);
        sellio::db::queries::update_product(
            &conn,
            &product.id,
            &sellio::models::UpdateProduct {
                name: None,
                description: None,
                price: None,
                is_published: None,
                duration_minutes: None,
                minimum_advance_hours: Some(24),
                buffer_minutes: Some(30),
                max_bookings_per_customer: None,
                delivery: None,
                external_url: None,
            },
        )
        .unwrap();
        let product = sellio::db::queries::get_product_by_id(&conn, &product.id)
            .unwrap()
            .unwrap();

        // One midnight slot per day for the next seven days.
        let today = sellio::util::now_store().date();
        let plan = sellio::scheduling::plan_recurring(
            &sellio::models::CreateRecurringSlots {
                weekdays: vec![1, 2, 3, 4, 5, 6, 7],
                start_time: time(0, 0),
                end_time: time(1, 0),
                duration_minutes: 60,
                weeks: 1,
                max_bookings: 1,
            },
            today,
        )
        .unwrap();
        assert_eq!(plan.len(), 7);
        let report =
            sellio::db::queries::insert_slots(&mut conn, &product.id, &creator.id, &plan).unwrap();
        assert_eq!(report.inserted, 7);

        // A busier day further out: three back-to-back hours, one booked.
        let busy_day = today + chrono::Duration::days(5);
        let booked = add_slot(&mut conn, &product, busy_day, time(10, 0), 1);
        add_slot(&mut conn, &product, busy_day, time(11, 0), 1);
        add_slot(&mut conn, &product, busy_day, time(12, 0), 1);
        place_order(&mut conn, &product, Some(&booked.id), "early@example.com");

        (creator, product, today, busy_day)
    };

    let response = router
        .oneshot(get(&format!(
            "/stores/{}/products/{}/slots",
            creator.id, product.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let days = body_json(response).await;
    let days = days.as_array().unwrap();

    // Tomorrow's midnight slot falls inside the 24h notice window, so the
    // listing starts the day after and runs to the end of the recurrence.
    assert_eq!(days.len(), 6);
    assert_eq!(
        days[0]["date"],
        (today + chrono::Duration::days(2)).format("%Y-%m-%d").to_string()
    );

    let busy = busy_day.format("%Y-%m-%d").to_string();
    for day in days {
        let starts: Vec<&str> = day["slots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["start_time"].as_str().unwrap())
            .collect();
        if day["date"] == busy {
            // 10:00 is full and 11:00 sits inside its 30-minute cooldown.
            assert_eq!(starts, vec!["00:00:00", "12:00:00"]);
        } else {
            assert_eq!(starts, vec!["00:00:00"]);
        }
    }
}

#[tokio::test]
async fn storefront_hides_unpublished_stores() {
    let app = test_app();
    let router = test_router(&app);
    let (creator, product) = {
        let conn = app.db().get().unwrap();
        let (creator, _) = create_test_creator(&conn, "hidden@example.com");
        let product = create_digital_product(&conn, &creator.id);
        sellio::db::queries::update_creator(
            &conn,
            &creator.id,
            &sellio::models::UpdateCreator {
                store_name: None,
                promptpay_id: None,
                is_published: Some(false),
            },
        )
        .unwrap();
        (creator, product)
    };

    let response = router
        .oneshot(get(&format!(
            "/stores/{}/products/{}/slots",
            creator.id, product.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_checkout_returns_payment_destination() {
    let app = test_app();
    let router = test_router(&app);
    let (product, slot) = {
        let mut conn = app.db().get().unwrap();
        let (creator, _) = create_test_creator(&conn, "checkout@example.com");
        let product = create_booking_product(&conn, &creator.id);
        let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
        (product, slot)
    };

    let response = router
        .clone()
        .oneshot(post_json(
            "/orders",
            json!({
                "product_id": product.id,
                "buyer_name": "Anan T.",
                "buyer_email": "anan@example.com",
                "slot_id": slot.id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "pending_payment");
    assert_eq!(order["pay_to_promptpay"], "0812345678");

    // The seat is gone; a second checkout conflicts.
    let response = router
        .oneshot(post_json(
            "/orders",
            json!({
                "product_id": product.id,
                "buyer_name": "Beam K.",
                "buyer_email": "beam@example.com",
                "slot_id": slot.id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_download_token_is_not_found() {
    let app = test_app();
    let router = test_router(&app);

    let response = router.oneshot(get("/downloads/no-such-token")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creators_cannot_see_each_others_orders() {
    let app = test_app();
    let router = test_router(&app);
    let (order_id, other_key) = {
        let mut conn = app.db().get().unwrap();
        let (creator_a, _) = create_test_creator(&conn, "owner@example.com");
        let (_, other_key) = create_test_creator(&conn, "intruder@example.com");
        let product = create_digital_product(&conn, &creator_a.id);
        let order = place_order(&mut conn, &product, None, "buyer@example.com");
        (order.id, other_key)
    };

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/creators/orders/{order_id}"))
                .header("authorization", format!("Bearer {other_key}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
