use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::CurrentUser;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::services::auth;
use crate::state::AppState;

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = auth::register(&state, &body.email, &body.password, &body.display_name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user: User,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = auth::login(&state, &body.email, &body.password).await?;
    Ok(Json(LoginResponse { token, user }))
}

// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let db = state.db()?;
    auth::logout(&db, &user.session_id)?;
    tracing::info!(user_id = %user.user_id, "session closed");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<User>> {
    let db = state.db()?;
    let user = queries::get_user(&db, &user.user_id)?
        .ok_or_else(|| AppError::NotFound("user".into()))?;
    Ok(Json(user))
}
