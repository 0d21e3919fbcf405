use serde::Serialize;

use crate::models::Booking;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    Cancelled,
}

/// Change notification pushed to owner consoles so they don't have to
/// re-fetch after every write.
#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub business_id: String,
    pub booking: Booking,
}

pub fn publish_booking_event(state: &AppState, kind: BookingEventKind, booking: &Booking) {
    let event = BookingEvent {
        kind,
        business_id: booking.business_id.clone(),
        booking: booking.clone(),
    };
    // No subscribers is the normal case
    let _ = state.booking_tx.send(event);
}
