use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use tower::ServiceExt;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::db::queries;
use barberbook::models::{Role, Session, User};
use barberbook::routes;
use barberbook::services::auth;
use barberbook::state::AppState;

// ── Helpers ──

/// A Monday at least a week ahead, so booking times are never in the past.
fn next_monday() -> NaiveDate {
    let today = Local::now().date_naive();
    let days_to_monday = (7 - today.weekday().num_days_from_monday()) % 7;
    today + Duration::days(7 + days_to_monday as i64)
}

fn monday() -> String {
    next_monday().format("%Y-%m-%d").to_string()
}

fn tuesday() -> String {
    (next_monday() + Duration::days(1)).format("%Y-%m-%d").to_string()
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        session_secret: "test-secret".to_string(),
        session_ttl_hours: 1,
        slot_step_minutes: 30,
        cancelled_blocks_slot: false,
        bootstrap_admin_email: None,
        cors_allow_origin: None,
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::new(conn, test_config()))
}

fn test_app(state: Arc<AppState>) -> Router {
    routes::router(state)
}

/// Inserts a user and an open session directly, skipping password hashing.
fn signed_in(state: &Arc<AppState>, name: &str, role: Role) -> (String, String) {
    let db = state.db.lock().unwrap();
    let now = Utc::now().naive_utc();
    let user = User {
        id: format!("user-{name}"),
        email: format!("{name}@example.com"),
        display_name: name.to_string(),
        role,
        password_hash: "unused".to_string(),
        created_at: now,
    };
    queries::create_user(&db, &user).unwrap();

    let session = Session {
        id: format!("session-{name}"),
        user_id: user.id.clone(),
        created_at: now,
        expires_at: now + Duration::hours(1),
    };
    queries::create_session(&db, &session).unwrap();

    (user.id, auth::sign_token("test-secret", &session.id))
}

async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = test_app(state.clone()).oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// Owner with a business open Monday 09:00-12:00 and a 30 minute cut.
/// Returns (owner token, business id, service id).
async fn setup_shop(state: &Arc<AppState>) -> (String, String, String) {
    let (_, owner_token) = signed_in(state, "owner", Role::Owner);

    let (status, business) = send(
        state,
        "POST",
        "/api/owner/business",
        Some(&owner_token),
        Some(serde_json::json!({
            "name": "Sharp Cuts",
            "address": "1 Main St",
            "hours": {
                "mon": {"open": "09:00", "close": "12:00", "isOpen": true},
                "tue": {"open": "09:00", "close": "12:00", "isOpen": false}
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, service) = send(
        state,
        "POST",
        "/api/owner/services",
        Some(&owner_token),
        Some(serde_json::json!({"name": "Cut", "duration_minutes": 30, "price_cents": 2500})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        owner_token,
        business["id"].as_str().unwrap().to_string(),
        service["id"].as_str().unwrap().to_string(),
    )
}

async fn slots(state: &Arc<AppState>, business_id: &str, service_id: &str, date: &str) -> Vec<String> {
    let (status, json) = send(
        state,
        "GET",
        &format!("/api/businesses/{business_id}/slots?date={date}&service_id={service_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect()
}

async fn book(
    state: &Arc<AppState>,
    token: &str,
    business_id: &str,
    service_id: &str,
    time: &str,
) -> (StatusCode, serde_json::Value) {
    send(
        state,
        "POST",
        "/api/bookings",
        Some(token),
        Some(serde_json::json!({
            "business_id": business_id,
            "service_id": service_id,
            "date": monday(),
            "time": time,
        })),
    )
    .await
}

// ── Health & Auth ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_register_login_me_logout() {
    let state = test_state();

    let (status, user) = send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": "Ann@Example.com", "password": "password123", "display_name": "Ann"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "ann@example.com");
    assert_eq!(user["role"], "client");
    assert!(user.get("password_hash").is_none());

    let (status, login) = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "ann@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, me) = send(&state, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["display_name"], "Ann");

    let (status, _) = send(&state, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&state, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let state = test_state();
    send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": "ben@example.com", "password": "password123"})),
    )
    .await;

    let (status, _) = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "ben@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_token_rejected() {
    let state = test_state();
    signed_in(&state, "eve", Role::Client);
    let (status, _) = send(&state, "GET", "/api/auth/me", Some("session-eve.forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_booking_requires_auth() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (status, _) = send(
        &state,
        "POST",
        "/api/bookings",
        None,
        Some(serde_json::json!({
            "business_id": business_id,
            "service_id": service_id,
            "date": monday(),
            "time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Client booking flow ──

#[tokio::test]
async fn test_public_business_listing() {
    let state = test_state();
    let (_, business_id, _) = setup_shop(&state).await;

    let (status, list) = send(&state, "GET", "/api/businesses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, detail) = send(&state, "GET", &format!("/api/businesses/{business_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Sharp Cuts");
    assert_eq!(detail["hours_summary"], "Mon: 09:00-12:00");
    assert_eq!(detail["services"][0]["name"], "Cut");

    let (status, _) = send(&state, "GET", "/api/businesses/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slots_and_booking_flow() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);
    let (_, bob) = signed_in(&state, "bob", Role::Client);

    assert_eq!(
        slots(&state, &business_id, &service_id, &monday()).await,
        vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]
    );

    let (status, booking) = book(&state, &alice, &business_id, &service_id, "10:00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["start_time"], "10:00");
    assert_eq!(booking["end_time"], "10:30");
    assert_eq!(booking["client_name"], "alice");

    assert_eq!(
        slots(&state, &business_id, &service_id, &monday()).await,
        vec!["09:00", "09:30", "10:30", "11:00", "11:30"]
    );

    // Same slot again is rejected server-side
    let (status, _) = book(&state, &bob, &business_id, &service_id, "10:00").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Adjacent slot is fine
    let (status, _) = book(&state, &bob, &business_id, &service_id, "09:30").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, mine) = send(&state, "GET", "/api/bookings", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_closed_day_and_off_grid_times() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    assert!(slots(&state, &business_id, &service_id, &tuesday()).await.is_empty());

    let (status, _) = book(&state, &alice, &business_id, &service_id, "10:15").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = book(&state, &alice, &business_id, &service_id, "12:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = book(&state, &alice, &business_id, &service_id, "25:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_past_dates_have_no_slots() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    // 2020-03-02 was a Monday
    assert!(slots(&state, &business_id, &service_id, "2020-03-02").await.is_empty());
}

#[tokio::test]
async fn test_out_of_range_dates_rejected_and_service_stays_up() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let (status, _) = send(
        &state,
        "GET",
        &format!("/api/businesses/{business_id}/slots?date=%2B262142-12-31&service_id={service_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        "POST",
        "/api/bookings",
        Some(&alice),
        Some(serde_json::json!({
            "business_id": business_id,
            "service_id": service_id,
            "date": "+262142-12-31",
            "time": "09:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    let (status, _) = send(&state, "GET", "/api/businesses", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cancel_frees_slot_and_is_idempotent() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let (_, booking) = book(&state, &alice, &business_id, &service_id, "10:00").await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let uri = format!("/api/bookings/{booking_id}/cancel");
    let (status, cancelled) = send(&state, "POST", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, again) = send(&state, "POST", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "cancelled");

    assert!(slots(&state, &business_id, &service_id, &monday())
        .await
        .contains(&"10:00".to_string()));

    // Soft delete: still listed with its status
    let (_, mine) = send(&state, "GET", "/api/bookings?status=cancelled", Some(&alice), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_blocks_when_configured() {
    let conn = db::init_db(":memory:").unwrap();
    let config = AppConfig {
        cancelled_blocks_slot: true,
        ..test_config()
    };
    let state = Arc::new(AppState::new(conn, config));
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let (_, booking) = book(&state, &alice, &business_id, &service_id, "10:00").await;
    let uri = format!("/api/bookings/{}/cancel", booking["id"].as_str().unwrap());
    send(&state, "POST", &uri, Some(&alice), None).await;

    assert!(!slots(&state, &business_id, &service_id, &monday())
        .await
        .contains(&"10:00".to_string()));
}

#[tokio::test]
async fn test_only_participants_can_cancel() {
    let state = test_state();
    let (owner, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);
    let (_, mallory) = signed_in(&state, "mallory", Role::Client);

    let (_, booking) = book(&state, &alice, &business_id, &service_id, "11:00").await;
    let uri = format!("/api/bookings/{}/cancel", booking["id"].as_str().unwrap());

    let (status, _) = send(&state, "POST", &uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&state, "POST", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");
}

#[tokio::test]
async fn test_calendar_download() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);
    let (_, booking) = book(&state, &alice, &business_id, &service_id, "09:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(
        &state,
        "GET",
        &format!("/api/bookings/{booking_id}.ics/ics"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let res = test_app(state)
        .oneshot(
            Request::builder()
                .uri(format!("/api/bookings/{booking_id}/ics"))
                .header("Authorization", format!("Bearer {alice}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains(&format!(
        "DTSTART:{}T090000",
        next_monday().format("%Y%m%d")
    )));
    assert!(ics.contains("SUMMARY:Cut at Sharp Cuts"));
}

// ── Owner console ──

#[tokio::test]
async fn test_owner_endpoints_require_owner_role() {
    let state = test_state();
    let (_, alice) = signed_in(&state, "alice", Role::Client);
    let (status, _) = send(
        &state,
        "POST",
        "/api/owner/business",
        Some(&alice),
        Some(serde_json::json!({"name": "Not Mine"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "GET", "/api/owner/bookings", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_business_profile() {
    let state = test_state();
    let (owner, _, _) = setup_shop(&state).await;

    let (status, _) = send(
        &state,
        "POST",
        "/api/owner/business",
        Some(&owner),
        Some(serde_json::json!({"name": "Second Shop"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &state,
        "PUT",
        "/api/owner/business",
        Some(&owner),
        Some(serde_json::json!({"hours": {"mon": {"open": "17:00", "close": "09:00", "isOpen": true}}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, business) = send(
        &state,
        "PUT",
        "/api/owner/business",
        Some(&owner),
        Some(serde_json::json!({
            "name": "Sharper Cuts",
            "hours": {"wed": {"open": "10:00", "close": "18:00", "isOpen": true}}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(business["name"], "Sharper Cuts");
    assert_eq!(business["hours"]["wed"]["open"], "10:00");
    assert!(business["hours"].get("mon").is_none());
}

#[tokio::test]
async fn test_service_edit_and_archive_keep_booking_snapshot() {
    let state = test_state();
    let (owner, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);
    let (_, booking) = book(&state, &alice, &business_id, &service_id, "09:00").await;

    let (status, service) = send(
        &state,
        "PUT",
        &format!("/api/owner/services/{service_id}"),
        Some(&owner),
        Some(serde_json::json!({"name": "Classic Cut", "duration_minutes": 45})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(service["name"], "Classic Cut");

    let (status, _) = send(
        &state,
        "PUT",
        &format!("/api/owner/services/{service_id}"),
        Some(&owner),
        Some(serde_json::json!({"price_cents": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        "DELETE",
        &format!("/api/owner/services/{service_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &state,
        "GET",
        &format!("/api/businesses/{business_id}/slots?date={}&service_id={service_id}", monday()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, services) = send(&state, "GET", "/api/owner/services", Some(&owner), None).await;
    assert_eq!(services[0]["active"], false);

    let (_, mine) = send(&state, "GET", "/api/bookings", Some(&alice), None).await;
    assert_eq!(mine[0]["id"], booking["id"]);
    assert_eq!(mine[0]["service_name"], "Cut");
    assert_eq!(mine[0]["service_duration_minutes"], 30);
}

#[tokio::test]
async fn test_owner_manual_entry_and_cancel() {
    let state = test_state();
    let (owner, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let (status, walk_in) = send(
        &state,
        "POST",
        "/api/owner/bookings",
        Some(&owner),
        Some(serde_json::json!({
            "service_id": service_id,
            "date": monday(),
            "time": "11:00",
            "client_name": "Walk-in Walt",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(walk_in["client_name"], "Walk-in Walt");
    assert!(walk_in["client_id"].is_null());

    // Manual entries block clients too
    let (status, _) = book(&state, &alice, &business_id, &service_id, "11:00").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/owner/bookings/{}/cancel", walk_in["id"].as_str().unwrap());
    let (status, cancelled) = send(&state, "POST", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, day) = send(
        &state,
        "GET",
        &format!("/api/owner/bookings?date={}", monday()),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(day.as_array().unwrap().len(), 1);
    assert_eq!(day[0]["status"], "cancelled");

    let (_, confirmed) = send(
        &state,
        "GET",
        "/api/owner/bookings?status=confirmed",
        Some(&owner),
        None,
    )
    .await;
    assert!(confirmed.as_array().unwrap().is_empty());

    let (status, _) = book(&state, &alice, &business_id, &service_id, "11:00").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_booking_events_broadcast() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let mut rx = state.booking_tx.subscribe();
    book(&state, &alice, &business_id, &service_id, "09:00").await;

    let event = rx.try_recv().unwrap();
    assert_eq!(event.business_id, business_id);
    assert_eq!(event.booking.service_name, "Cut");
}

#[tokio::test]
async fn test_owner_events_requires_owner_token() {
    let state = test_state();
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let (status, _) = send(&state, "GET", "/api/owner/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&state, "GET", &format!("/api/owner/events?token={alice}"), None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_event_stream_ends_after_sign_out() {
    let state = test_state();
    let (owner, business_id, service_id) = setup_shop(&state).await;
    let (_, alice) = signed_in(&state, "alice", Role::Client);

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/api/owner/events?token={owner}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (status, _) = send(&state, "POST", "/api/auth/logout", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = book(&state, &alice, &business_id, &service_id, "09:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let body = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        axum::body::to_bytes(res.into_body(), usize::MAX),
    )
    .await
    .expect("event stream should close once the session is gone")
    .unwrap();
    assert!(!String::from_utf8_lossy(&body).contains("booking_event"));
}

// ── Admin console ──

#[tokio::test]
async fn test_role_assignment_requires_admin() {
    let state = test_state();
    let (alice_id, alice) = signed_in(&state, "alice", Role::Client);

    let (status, _) = send(
        &state,
        "POST",
        "/api/admin/assign-admin-role",
        Some(&alice),
        Some(serde_json::json!({"target_user_id": alice_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "GET", "/api/admin/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assign_user_role() {
    let state = test_state();
    let (_, admin) = signed_in(&state, "root", Role::Admin);
    let (carl_id, carl) = signed_in(&state, "carl", Role::Client);

    let (status, user) = send(
        &state,
        "POST",
        "/api/admin/assign-user-role",
        Some(&admin),
        Some(serde_json::json!({"target_user_id": carl_id, "role": "owner"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "owner");

    // Old session no longer carries the stale role
    let (status, _) = send(&state, "GET", "/api/auth/me", Some(&carl), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &state,
        "POST",
        "/api/admin/assign-user-role",
        Some(&admin),
        Some(serde_json::json!({"target_user_id": carl_id, "role": "superuser"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        "POST",
        "/api/admin/assign-user-role",
        Some(&admin),
        Some(serde_json::json!({"target_user_id": "nobody", "role": "client"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, owners) = send(&state, "GET", "/api/admin/users?role=owner", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owners.as_array().unwrap().len(), 1);
    assert_eq!(owners[0]["id"], carl_id.as_str());
}

#[tokio::test]
async fn test_assign_admin_role() {
    let state = test_state();
    let (_, admin) = signed_in(&state, "root", Role::Admin);
    let (dana_id, _) = signed_in(&state, "dana", Role::Client);

    let (status, user) = send(
        &state,
        "POST",
        "/api/admin/assign-admin-role",
        Some(&admin),
        Some(serde_json::json!({"target_user_id": dana_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "admin");
}

#[tokio::test]
async fn test_admin_stats_and_businesses() {
    let state = test_state();
    let (_, business_id, service_id) = setup_shop(&state).await;
    let (_, admin) = signed_in(&state, "root", Role::Admin);
    let (_, alice) = signed_in(&state, "alice", Role::Client);
    book(&state, &alice, &business_id, &service_id, "09:00").await;

    let (status, stats) = send(&state, "GET", "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["clients"], 1);
    assert_eq!(stats["owners"], 1);
    assert_eq!(stats["admins"], 1);
    assert_eq!(stats["businesses"], 1);
    assert_eq!(stats["upcoming_bookings"], 1);

    let (status, businesses) = send(&state, "GET", "/api/admin/businesses", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(businesses[0]["id"], business_id.as_str());
}
