pub mod admin;
pub mod auth;
pub mod bookings;
pub mod businesses;
pub mod calendar;
pub mod events;
pub mod health;
pub mod owner;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::errors::AppError;
use crate::models::hours::parse_time;
use crate::models::BookingStatus;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date (expected YYYY-MM-DD): {s}")))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(AppError::BadRequest(format!(
            "date must be between years {MIN_YEAR} and {MAX_YEAR}: {s}"
        )));
    }
    Ok(date)
}

pub(crate) fn parse_start(date: &str, time: &str) -> Result<NaiveDateTime, AppError> {
    let date = parse_date(date)?;
    let time = parse_time(time.trim())
        .map_err(|_| AppError::BadRequest(format!("invalid time (expected HH:MM): {time}")))?;
    Ok(date.and_time(time))
}

pub(crate) fn parse_status(s: Option<&str>) -> Result<Option<BookingStatus>, AppError> {
    match s {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => BookingStatus::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}"))),
    }
}

pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
