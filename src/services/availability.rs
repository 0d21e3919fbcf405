use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus};

/// Which existing bookings occupy their interval when computing availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyPolicy {
    /// Cancelled bookings free their slot immediately.
    ConfirmedOnly,
    /// Every persisted booking blocks, whatever its status.
    AllStatuses,
}

impl OccupancyPolicy {
    pub fn blocks(&self, booking: &Booking) -> bool {
        match self {
            OccupancyPolicy::ConfirmedOnly => booking.status == BookingStatus::Confirmed,
            OccupancyPolicy::AllStatuses => true,
        }
    }
}

/// Half-open interval overlap: `[s1, e1)` and `[s2, e2)`.
pub fn overlaps(s1: NaiveDateTime, e1: NaiveDateTime, s2: NaiveDateTime, e2: NaiveDateTime) -> bool {
    s1 < e2 && e1 > s2
}

/// The local-day window bookings are fetched for: midnight to 23:59:59.999.
/// `None` at the edge of the representable calendar.
pub fn day_range(date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = date.and_time(NaiveTime::MIN);
    let end = start
        .checked_add_signed(Duration::days(1))?
        .checked_sub_signed(Duration::milliseconds(1))?;
    Some((start, end))
}

/// Keeps the slots whose occupied interval doesn't overlap any blocking
/// booking. Order is preserved; no bookings means every slot survives.
pub fn filter_available(
    date: NaiveDate,
    slots: &[NaiveTime],
    duration_minutes: i32,
    bookings: &[Booking],
    policy: OccupancyPolicy,
) -> Vec<NaiveTime> {
    let blocking: Vec<(NaiveDateTime, NaiveDateTime)> = bookings
        .iter()
        .filter(|b| policy.blocks(b))
        .map(|b| (b.start, b.end()))
        .collect();

    let duration = Duration::minutes(duration_minutes as i64);

    slots
        .iter()
        .copied()
        .filter(|slot| {
            let start = date.and_time(*slot);
            let end = start + duration;
            !blocking
                .iter()
                .any(|(b_start, b_end)| overlaps(start, end, *b_start, *b_end))
        })
        .collect()
}
