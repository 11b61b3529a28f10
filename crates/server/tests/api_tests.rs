use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{self, Request, StatusCode};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use tower::ServiceExt;

use nightwatch_auth::{JwtManager, OtpAuthenticator};
use nightwatch_core::MessageType;
use nightwatch_server::config::NightwatchConfig;
use nightwatch_server::state::AppState;
use nightwatch_store::Store;
use nightwatch_store_memory::MemoryStore;

fn test_state() -> AppState {
    AppState {
        store: Arc::new(MemoryStore::new()),
        jwt: Arc::new(JwtManager::new(&SecretString::from("test-secret".to_owned()), Duration::hours(24))),
        otp: Arc::new(OtpAuthenticator::new(Duration::minutes(10))),
        config: Arc::new(NightwatchConfig::default()),
    }
}

fn build_app(state: AppState) -> axum::Router {
    nightwatch_server::api::router(state)
}

fn test_addr() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0)))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Walks a phone number through `/auth/register` -> outbox -> `/auth/verify`
/// and returns the bearer token plus the caller's own user id.
async fn register_and_verify(state: &AppState, phone: &str) -> (String, i64) {
    let app = build_app(state.clone());
    let register_body = serde_json::json!({ "phone": phone, "name": "Night Owl" });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/auth/register")
                .header(http::header::CONTENT_TYPE, "application/json")
                .extension(test_addr())
                .body(Body::from(serde_json::to_string(&register_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outbox = state.store.select_due_outbox_items(10, Utc::now()).await.unwrap();
    let item = outbox
        .iter()
        .rev()
        .find(|i| i.message_type == MessageType::OtpVerification)
        .expect("otp outbox item");
    let code = item.payload["otp"].as_str().unwrap().to_owned();

    let app = build_app(state.clone());
    let verify_body = serde_json::json!({ "phone": phone, "code": code });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/auth/verify")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&verify_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let token = json["token"].as_str().unwrap().to_owned();
    let user_id = json["user"]["user_id"].as_i64().unwrap();
    (token, user_id)
}

fn bearer(req: http::request::Builder, token: &str) -> http::request::Builder {
    req.header(http::header::AUTHORIZATION, format!("Bearer {token}"))
}

#[tokio::test]
async fn health_returns_200() {
    let state = test_state();
    let app = build_app(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn first_registered_user_becomes_admin() {
    let state = test_state();
    let (_, user_id) = register_and_verify(&state, "+15551234567").await;
    let user = state.store.get_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.role, nightwatch_core::Role::Admin);
}

#[tokio::test]
async fn verify_with_wrong_code_returns_401() {
    let state = test_state();
    let app = build_app(state.clone());
    let register_body = serde_json::json!({ "phone": "+15550001111", "name": "Guest" });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/auth/register")
                .header(http::header::CONTENT_TYPE, "application/json")
                .extension(test_addr())
                .body(Body::from(serde_json::to_string(&register_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_app(state);
    let verify_body = serde_json::json!({ "phone": "+15550001111", "code": "000000" });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/auth/verify")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&verify_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_cannot_create_schedule() {
    let state = test_state();
    // Bootstrap admin first so the second registrant is a plain Owl.
    register_and_verify(&state, "+15559990000").await;
    let (token, _) = register_and_verify(&state, "+15559990001").await;

    let app = build_app(state);
    let body = serde_json::json!({
        "name": "Weeknight Patrol",
        "cron_expr": "0 22 * * *",
        "start_date": null,
        "end_date": null,
        "duration_minutes": 120,
        "timezone": "UTC",
    });
    let response = app
        .oneshot(
            bearer(Request::builder().method(http::Method::POST).uri("/api/admin/schedules"), &token)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn protected_route_without_token_returns_401() {
    let state = test_state();
    let app = build_app(state);

    let response = app
        .oneshot(Request::builder().uri("/bookings/my").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

async fn admin_create_schedule(state: &AppState, token: &str) -> i64 {
    let app = build_app(state.clone());
    let body = serde_json::json!({
        "name": "Weeknight Patrol",
        "cron_expr": "0 22 * * *",
        "start_date": null,
        "end_date": null,
        "duration_minutes": 120,
        "timezone": "UTC",
    });
    let response = app
        .oneshot(
            bearer(Request::builder().method(http::Method::POST).uri("/api/admin/schedules"), token)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["schedule_id"].as_i64().unwrap()
}

#[tokio::test]
async fn booking_race_only_one_slot_taken_wins() {
    let state = test_state();
    let (token, _) = register_and_verify(&state, "+15557770001").await;
    let schedule_id = admin_create_schedule(&state, &token).await;

    let schedule = state.store.get_schedule(schedule_id).await.unwrap().unwrap();
    let slots = nightwatch_core::calendar::expand(&schedule, Utc::now(), Utc::now() + Duration::days(30)).unwrap();
    let shift_start = slots.first().expect("at least one upcoming slot").start_utc;

    let book = |token: String| {
        let state = state.clone();
        let shift_start = shift_start;
        async move {
            let app = build_app(state);
            let body = serde_json::json!({
                "schedule_id": schedule_id,
                "shift_start": shift_start,
                "buddy_user_id": null,
                "buddy_name": null,
            });
            app.oneshot(
                bearer(Request::builder().method(http::Method::POST).uri("/bookings"), &token)
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    let (first, second) = tokio::join!(book(token.clone()), book(token));
    let statuses = [first.status(), second.status()];
    assert!(statuses.contains(&StatusCode::CREATED), "expected one booking to succeed, got {statuses:?}");
    assert!(statuses.contains(&StatusCode::CONFLICT), "expected one booking to collide, got {statuses:?}");
}

#[tokio::test]
async fn checkin_too_early_is_rejected() {
    let state = test_state();
    let (token, _) = register_and_verify(&state, "+15557770010").await;
    let schedule_id = admin_create_schedule(&state, &token).await;
    let schedule = state.store.get_schedule(schedule_id).await.unwrap().unwrap();
    let from = Utc::now() + Duration::days(3);
    let slots = nightwatch_core::calendar::expand(&schedule, from, from + Duration::days(30)).unwrap();
    let shift_start = slots.first().expect("at least one upcoming slot").start_utc;

    let app = build_app(state.clone());
    let body = serde_json::json!({
        "schedule_id": schedule_id,
        "shift_start": shift_start,
        "buddy_user_id": null,
        "buddy_name": null,
    });
    let response = app
        .oneshot(
            bearer(Request::builder().method(http::Method::POST).uri("/bookings"), &token)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking = body_json(response).await;
    let booking_id = booking["booking_id"].as_i64().unwrap();

    let app = build_app(state);
    let response = app
        .oneshot(
            bearer(Request::builder().method(http::Method::POST).uri(format!("/bookings/{booking_id}/checkin")), &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_can_create_broadcast() {
    let state = test_state();
    let (token, _) = register_and_verify(&state, "+15557770020").await;

    let app = build_app(state);
    let body = serde_json::json!({
        "title": "Storm warning",
        "message": "Patrol routes shifted to high ground tonight.",
        "audience": "all",
    });
    let response = app
        .oneshot(
            bearer(Request::builder().method(http::Method::POST).uri("/api/admin/broadcasts"), &token)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Storm warning");
}

#[tokio::test]
async fn swagger_ui_returns_200() {
    let state = test_state();
    let app = build_app(state);

    let response = app
        .oneshot(Request::builder().uri("/swagger-ui/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_json_lists_expected_paths() {
    let state = test_state();
    let app = build_app(state);

    let response = app
        .oneshot(Request::builder().uri("/api-doc/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    let paths = spec["paths"].as_object().unwrap();
    assert!(paths.contains_key("/auth/register"));
    assert!(paths.contains_key("/bookings"));
    assert!(paths.contains_key("/api/admin/broadcasts"));
}
