use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::models::{Booking, BookingStatus, Business, Service, WeeklyHours};
use crate::services::availability::{day_range, filter_available, OccupancyPolicy};
use crate::services::slots::slots_for_date;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("that time is outside business hours; open: {hours}")]
    OutsideBusinessHours { hours: String },

    #[error("that time slot is already booked")]
    Conflict,

    #[error("bookings can't start in the past")]
    InPast,

    #[error("service is no longer offered")]
    ServiceArchived,

    #[error("service does not belong to this business")]
    ServiceMismatch,

    #[error("date is out of range")]
    DateOutOfRange,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulingError::Database(err.into())
    }
}

/// Slot grid and occupancy rules applied to every availability computation.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingRules {
    pub step_minutes: i64,
    pub policy: OccupancyPolicy,
}

pub struct BookingRequest<'a> {
    pub business: &'a Business,
    pub service: &'a Service,
    pub start: NaiveDateTime,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
}

/// A start is valid when it is one of the day's generated slots and survives
/// the availability filter against `existing`.
pub fn validate_booking_time(
    hours: &WeeklyHours,
    start: &NaiveDateTime,
    duration_minutes: i32,
    existing: &[Booking],
    rules: SchedulingRules,
) -> Result<(), SchedulingError> {
    let date = start.date();
    let candidates = slots_for_date(hours, date, duration_minutes, rules.step_minutes);

    if !candidates.contains(&start.time()) {
        return Err(SchedulingError::OutsideBusinessHours {
            hours: hours.to_human_readable(),
        });
    }

    let available = filter_available(date, &candidates, duration_minutes, existing, rules.policy);
    if !available.contains(&start.time()) {
        return Err(SchedulingError::Conflict);
    }

    Ok(())
}

/// Re-checks availability and writes the booking inside one immediate
/// transaction, so two requests for the same slot can't both succeed.
pub fn book_slot(
    conn: &mut Connection,
    request: BookingRequest<'_>,
    rules: SchedulingRules,
    now: NaiveDateTime,
) -> Result<Booking, SchedulingError> {
    let BookingRequest {
        business,
        service,
        start,
        client_id,
        client_name,
    } = request;

    if service.business_id != business.id {
        return Err(SchedulingError::ServiceMismatch);
    }
    if !service.active {
        return Err(SchedulingError::ServiceArchived);
    }
    if start < now {
        return Err(SchedulingError::InPast);
    }
    let (day_start, day_end) = day_range(start.date()).ok_or(SchedulingError::DateOutOfRange)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing = queries::get_bookings_in_range(&tx, &business.id, &day_start, &day_end)?;

    validate_booking_time(
        &business.hours,
        &start,
        service.duration_minutes,
        &existing,
        rules,
    )?;

    let created_at = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        business_id: business.id.clone(),
        client_id,
        client_name,
        service_id: service.id.clone(),
        service_name: service.name.clone(),
        service_duration_minutes: service.duration_minutes,
        start,
        status: BookingStatus::Confirmed,
        created_at,
        updated_at: created_at,
    };
    queries::create_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        business_id = %booking.business_id,
        start = %booking.start,
        "booking created"
    );

    Ok(booking)
}
