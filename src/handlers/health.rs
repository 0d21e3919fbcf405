use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let db = state.db()?;
    db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
