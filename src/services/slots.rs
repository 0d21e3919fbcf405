use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::models::{DayHours, WeeklyHours};

pub const DEFAULT_STEP_MINUTES: i64 = 30;

/// Candidate start times for one day's hours.
///
/// Starts at `open` and advances by `step_minutes` regardless of the service
/// duration, keeping every start whose `start + duration` still fits before
/// `close`. Long services therefore get overlapping candidates; the
/// availability filter decides which ones survive. Closed days, missing or
/// malformed hours, and non-positive durations produce no slots.
pub fn generate_slots(
    hours: Option<&DayHours>,
    duration_minutes: i32,
    step_minutes: i64,
) -> Vec<NaiveTime> {
    let Some((open, close)) = hours.and_then(DayHours::bounds) else {
        return Vec::new();
    };
    if duration_minutes <= 0 || step_minutes <= 0 {
        return Vec::new();
    }

    // Minutes since midnight; NaiveTime arithmetic would wrap past 24:00.
    let open = minutes_of(open);
    let close = minutes_of(close);
    let duration = duration_minutes as i64;

    let mut slots = Vec::new();
    let mut current = open;
    while current + duration <= close {
        if let Some(t) = time_from_minutes(current) {
            slots.push(t);
        }
        current += step_minutes;
    }
    slots
}

/// Looks up the weekday for `date` and generates its slots.
pub fn slots_for_date(
    hours: &WeeklyHours,
    date: NaiveDate,
    duration_minutes: i32,
    step_minutes: i64,
) -> Vec<NaiveTime> {
    generate_slots(hours.for_date(date), duration_minutes, step_minutes)
}

fn minutes_of(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

fn time_from_minutes(minutes: i64) -> Option<NaiveTime> {
    let minutes = u32::try_from(minutes).ok()?;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
