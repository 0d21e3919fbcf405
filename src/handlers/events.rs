use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::context::{self, ensure_role};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Role;
use crate::state::AppState;

/// Re-read per event so sign-out or a role change stops delivery.
fn session_active(state: &AppState, session_id: &str) -> bool {
    let Ok(db) = state.db() else {
        return false;
    };
    matches!(queries::get_active_session(&db, session_id), Ok(Some(_)))
}

// GET /api/owner/events (SSE)
#[derive(Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
}

pub async fn owner_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    // Auth via query param (EventSource can't set headers)
    let token = query.token.as_deref().unwrap_or("");
    let user = context::resolve(&state, token)?;
    ensure_role(&user, Role::Owner)?;

    let business_id = {
        let db = state.db()?;
        queries::get_business_by_owner(&db, &user.user_id)?
            .map(|b| b.id)
            .ok_or_else(|| AppError::NotFound("business".into()))?
    };

    tracing::info!(user_id = %user.user_id, business_id = %business_id, "owner subscribed to booking events");

    let rx = state.booking_tx.subscribe();
    let session_id = user.session_id.clone();
    let stream = BroadcastStream::new(rx)
        .take_while(move |_| {
            let active = session_active(&state, &session_id);
            if !active {
                tracing::info!(session_id = %session_id, "session ended, closing booking event stream");
            }
            active
        })
        .filter_map(move |result| match result {
            Ok(event) if event.business_id == business_id => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(Event::default().data(data).event("booking_event")))
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "booking event subscriber lagged");
                None
            }
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30))))
}
