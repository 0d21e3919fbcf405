use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::context::CurrentUser;
use crate::errors::AppResult;
use crate::handlers::bookings::load_accessible_booking;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

// GET /api/bookings/:id/ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(booking_id): Path<String>,
) -> AppResult<Response> {
    let (booking, business) = {
        let db = state.db()?;
        load_accessible_booking(&db, &user, &booking_id)?
    };

    let ics = generate_ics(&booking, &business.name, &business.address);
    let filename = format!("booking-{}.ics", booking.id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
