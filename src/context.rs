use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::errors::AppError;
use crate::models::Role;
use crate::services::auth;
use crate::state::AppState;

/// The signed-in caller, resolved once per request from the bearer token
/// and handed to handlers explicitly.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub session_id: String,
    pub role: Role,
    pub display_name: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_role(user: &CurrentUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &CurrentUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

/// Resolves a raw token. Shared by the header extractor and the SSE
/// endpoint, which receives its token as a query parameter.
pub fn resolve(state: &AppState, token: &str) -> Result<CurrentUser, AppError> {
    let resolved = {
        let db = state.db()?;
        auth::resolve_token(&db, &state.config.session_secret, token)?
    };

    let (session, user) = resolved.ok_or(AppError::Unauthorized)?;
    Ok(CurrentUser {
        user_id: user.id,
        session_id: session.id,
        role: user.role,
        display_name: user.display_name,
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        resolve(state, token)
    }
}
