use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::context::{ensure_role, CurrentUser};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::handlers::bookings::{cancel, BookingResponse};
use crate::handlers::{local_now, parse_date, parse_start, parse_status};
use crate::models::{Business, Role, Service, WeeklyHours};
use crate::services::availability::day_range;
use crate::services::events::{publish_booking_event, BookingEventKind};
use crate::services::scheduling::{book_slot, BookingRequest};
use crate::state::AppState;

fn owned_business(conn: &Connection, user: &CurrentUser) -> Result<Business, AppError> {
    ensure_role(user, Role::Owner)?;
    queries::get_business_by_owner(conn, &user.user_id)?
        .ok_or_else(|| AppError::NotFound("business".into()))
}

fn owned_service(conn: &Connection, business: &Business, id: &str) -> Result<Service, AppError> {
    queries::get_service(conn, id)?
        .filter(|s| s.business_id == business.id)
        .ok_or_else(|| AppError::NotFound("service".into()))
}

fn validate_hours(hours: &WeeklyHours) -> Result<(), AppError> {
    hours
        .validate()
        .map_err(|e| AppError::BadRequest(format!("invalid hours: {e}")))
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

// ── Business profile ──

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hours: WeeklyHours,
}

// POST /api/owner/business
pub async fn create_business(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<CreateBusinessRequest>,
) -> AppResult<(StatusCode, Json<Business>)> {
    ensure_role(&user, Role::Owner)?;
    validate_hours(&body.hours)?;

    let db = state.db()?;
    if queries::get_business_by_owner(&db, &user.user_id)?.is_some() {
        return Err(AppError::Conflict("owner already has a business".into()));
    }

    let now = Utc::now().naive_utc();
    let business = Business {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: user.user_id.clone(),
        name: required("name", &body.name)?,
        address: body.address.trim().to_string(),
        phone: body.phone.trim().to_string(),
        description: body.description,
        hours: body.hours,
        created_at: now,
        updated_at: now,
    };
    queries::create_business(&db, &business)?;

    tracing::info!(business_id = %business.id, owner_id = %user.user_id, "business created");
    Ok((StatusCode::CREATED, Json(business)))
}

// GET /api/owner/business
pub async fn get_business(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<Business>> {
    let db = state.db()?;
    Ok(Json(owned_business(&db, &user)?))
}

#[derive(Deserialize)]
pub struct UpdateBusinessRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub hours: Option<WeeklyHours>,
}

// PUT /api/owner/business
pub async fn update_business(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<UpdateBusinessRequest>,
) -> AppResult<Json<Business>> {
    let db = state.db()?;
    let mut business = owned_business(&db, &user)?;

    if let Some(name) = body.name {
        business.name = required("name", &name)?;
    }
    if let Some(address) = body.address {
        business.address = address.trim().to_string();
    }
    if let Some(phone) = body.phone {
        business.phone = phone.trim().to_string();
    }
    if let Some(description) = body.description {
        business.description = description;
    }
    if let Some(hours) = body.hours {
        validate_hours(&hours)?;
        business.hours = hours;
    }

    queries::update_business(&db, &business)?;
    let business = queries::get_business(&db, &business.id)?
        .ok_or_else(|| AppError::NotFound("business".into()))?;

    tracing::info!(business_id = %business.id, "business profile updated");
    Ok(Json(business))
}

// ── Services ──

// GET /api/owner/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Service>>> {
    let db = state.db()?;
    let business = owned_business(&db, &user)?;
    Ok(Json(queries::list_services(&db, &business.id, true)?))
}

#[derive(Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
}

fn validate_service_fields(duration_minutes: i32, price_cents: i64) -> Result<(), AppError> {
    if duration_minutes <= 0 {
        return Err(AppError::BadRequest("duration_minutes must be positive".into()));
    }
    if price_cents < 0 {
        return Err(AppError::BadRequest("price_cents can't be negative".into()));
    }
    Ok(())
}

// POST /api/owner/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<ServiceRequest>,
) -> AppResult<(StatusCode, Json<Service>)> {
    validate_service_fields(body.duration_minutes, body.price_cents)?;

    let db = state.db()?;
    let business = owned_business(&db, &user)?;
    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        business_id: business.id,
        name: required("name", &body.name)?,
        duration_minutes: body.duration_minutes,
        price_cents: body.price_cents,
        active: true,
    };
    queries::create_service(&db, &service)?;

    tracing::info!(service_id = %service.id, business_id = %service.business_id, "service created");
    Ok((StatusCode::CREATED, Json(service)))
}

#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price_cents: Option<i64>,
    pub active: Option<bool>,
}

// PUT /api/owner/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateServiceRequest>,
) -> AppResult<Json<Service>> {
    let db = state.db()?;
    let business = owned_business(&db, &user)?;
    let mut service = owned_service(&db, &business, &id)?;

    if let Some(name) = body.name {
        service.name = required("name", &name)?;
    }
    if let Some(duration) = body.duration_minutes {
        service.duration_minutes = duration;
    }
    if let Some(price) = body.price_cents {
        service.price_cents = price;
    }
    if let Some(active) = body.active {
        service.active = active;
    }
    validate_service_fields(service.duration_minutes, service.price_cents)?;

    // Existing bookings keep their snapshot of name and duration.
    queries::update_service(&db, &service)?;
    Ok(Json(service))
}

// DELETE /api/owner/services/:id
pub async fn archive_service(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let db = state.db()?;
    let business = owned_business(&db, &user)?;
    let service = owned_service(&db, &business, &id)?;
    queries::archive_service(&db, &service.id)?;

    tracing::info!(service_id = %service.id, "service archived");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── Bookings ──

#[derive(Deserialize)]
pub struct OwnerBookingsQuery {
    pub date: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

// GET /api/owner/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<OwnerBookingsQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let range = match query.date.as_deref().filter(|d| !d.is_empty()) {
        Some(d) => Some(
            day_range(parse_date(d)?)
                .ok_or_else(|| AppError::BadRequest("date is out of range".into()))?,
        ),
        None => None,
    };
    let status = parse_status(query.status.as_deref())?;
    let limit = query.limit.unwrap_or(200).clamp(1, 1000);

    let db = state.db()?;
    let business = owned_business(&db, &user)?;
    let bookings = queries::get_bookings_for_business(&db, &business.id, range, status, limit)?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct ManualBookingRequest {
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub client_name: String,
}

// POST /api/owner/bookings
pub async fn create_manual_booking(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<ManualBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let start = parse_start(&body.date, &body.time)?;
    let client_name = required("client_name", &body.client_name)?;

    let booking = {
        let mut db = state.db()?;
        let business = owned_business(&db, &user)?;
        let service = owned_service(&db, &business, &body.service_id)?;

        book_slot(
            &mut db,
            BookingRequest {
                business: &business,
                service: &service,
                start,
                client_id: None,
                client_name: Some(client_name),
            },
            state.config.scheduling_rules(),
            local_now(),
        )?
    };

    publish_booking_event(&state, BookingEventKind::Created, &booking);
    Ok((StatusCode::CREATED, Json(booking.into())))
}

// POST /api/owner/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookingResponse>> {
    ensure_role(&user, Role::Owner)?;
    let booking = cancel(&state, &user, &id)?;
    Ok(Json(booking.into()))
}
