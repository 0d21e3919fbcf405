use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::handlers::{local_now, parse_date};
use crate::models::hours::format_time;
use crate::models::{Business, Service};
use crate::services::availability::{day_range, filter_available};
use crate::services::slots::slots_for_date;
use crate::state::AppState;

// GET /api/businesses
pub async fn list_businesses(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Business>>> {
    let db = state.db()?;
    Ok(Json(queries::list_businesses(&db)?))
}

// GET /api/businesses/:id
#[derive(Serialize)]
pub struct BusinessDetail {
    #[serde(flatten)]
    business: Business,
    hours_summary: String,
    services: Vec<Service>,
}

pub async fn get_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BusinessDetail>> {
    let db = state.db()?;
    let business =
        queries::get_business(&db, &id)?.ok_or_else(|| AppError::NotFound("business".into()))?;
    let services = queries::list_services(&db, &business.id, false)?;

    Ok(Json(BusinessDetail {
        hours_summary: business.hours.to_human_readable(),
        business,
        services,
    }))
}

// GET /api/businesses/:id/slots?date=YYYY-MM-DD&service_id=
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub service_id: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    date: String,
    service_id: String,
    duration_minutes: i32,
    slots: Vec<String>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<SlotsResponse>> {
    let date = parse_date(&query.date)?;
    let (day_start, day_end) =
        day_range(date).ok_or_else(|| AppError::BadRequest("date is out of range".into()))?;
    let rules = state.config.scheduling_rules();

    let (business, service, existing) = {
        let db = state.db()?;
        let business = queries::get_business(&db, &id)?
            .ok_or_else(|| AppError::NotFound("business".into()))?;
        let service = queries::get_service(&db, &query.service_id)?
            .filter(|s| s.business_id == business.id)
            .ok_or_else(|| AppError::NotFound("service".into()))?;
        if !service.active {
            return Err(AppError::BadRequest("service is no longer offered".into()));
        }
        let existing = queries::get_bookings_in_range(&db, &business.id, &day_start, &day_end)?;
        (business, service, existing)
    };

    let candidates = slots_for_date(&business.hours, date, service.duration_minutes, rules.step_minutes);
    let available = filter_available(
        date,
        &candidates,
        service.duration_minutes,
        &existing,
        rules.policy,
    );

    let now = local_now();
    let slots = available
        .into_iter()
        .filter(|t| date.and_time(*t) >= now)
        .map(format_time)
        .collect();

    Ok(Json(SlotsResponse {
        date: date.format("%Y-%m-%d").to_string(),
        service_id: service.id,
        duration_minutes: service.duration_minutes,
        slots,
    }))
}
