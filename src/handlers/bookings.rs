use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::context::CurrentUser;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::handlers::{local_now, parse_start, parse_status};
use crate::models::{Booking, BookingStatus, Business};
use crate::services::events::{publish_booking_event, BookingEventKind};
use crate::services::scheduling::{book_slot, BookingRequest};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    business_id: String,
    client_id: Option<String>,
    client_name: Option<String>,
    service_id: String,
    service_name: String,
    service_duration_minutes: i32,
    date: String,
    start_time: String,
    end_time: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        let end = b.end();
        Self {
            date: b.start.format("%Y-%m-%d").to_string(),
            start_time: b.start.format("%H:%M").to_string(),
            end_time: end.format("%H:%M").to_string(),
            status: b.status.as_str().to_string(),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            id: b.id,
            business_id: b.business_id,
            client_id: b.client_id,
            client_name: b.client_name,
            service_id: b.service_id,
            service_name: b.service_name,
            service_duration_minutes: b.service_duration_minutes,
        }
    }
}

/// Loads a booking the caller may act on: its client, the owner of its
/// business, or an admin.
pub(crate) fn load_accessible_booking(
    conn: &Connection,
    user: &CurrentUser,
    booking_id: &str,
) -> Result<(Booking, Business), AppError> {
    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking".into()))?;
    let business = queries::get_business(conn, &booking.business_id)?
        .ok_or_else(|| AppError::NotFound("business".into()))?;

    let is_client = booking.client_id.as_deref() == Some(user.user_id.as_str());
    let is_owner = business.owner_id == user.user_id;
    if !(is_client || is_owner || user.is_admin()) {
        // Don't reveal other people's bookings
        return Err(AppError::NotFound("booking".into()));
    }
    Ok((booking, business))
}

/// Soft-cancels a booking. Already-cancelled bookings are returned as-is.
pub(crate) fn cancel(state: &AppState, user: &CurrentUser, booking_id: &str) -> AppResult<Booking> {
    let booking = {
        let db = state.db()?;
        let (booking, _) = load_accessible_booking(&db, user, booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }
        queries::update_booking_status(&db, &booking.id, BookingStatus::Cancelled)?;
        queries::get_booking_by_id(&db, &booking.id)?
            .ok_or_else(|| AppError::NotFound("booking".into()))?
    };

    tracing::info!(booking_id = %booking.id, user_id = %user.user_id, "booking cancelled");
    publish_booking_event(state, BookingEventKind::Cancelled, &booking);
    Ok(booking)
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub business_id: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let start = parse_start(&body.date, &body.time)?;

    let booking = {
        let mut db = state.db()?;
        let business = queries::get_business(&db, &body.business_id)?
            .ok_or_else(|| AppError::NotFound("business".into()))?;
        let service = queries::get_service(&db, &body.service_id)?
            .ok_or_else(|| AppError::NotFound("service".into()))?;

        book_slot(
            &mut db,
            BookingRequest {
                business: &business,
                service: &service,
                start,
                client_id: Some(user.user_id.clone()),
                client_name: Some(user.display_name.clone()),
            },
            state.config.scheduling_rules(),
            local_now(),
        )?
    };

    publish_booking_event(&state, BookingEventKind::Created, &booking);
    Ok((StatusCode::CREATED, Json(booking.into())))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub status: Option<String>,
}

pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<MyBookingsQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let status = parse_status(query.status.as_deref())?;
    let db = state.db()?;
    let bookings = queries::get_bookings_for_client(&db, &user.user_id, status)?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookingResponse>> {
    let booking = cancel(&state, &user, &id)?;
    Ok(Json(booking.into()))
}
