use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::{ensure_admin, CurrentUser};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::handlers::local_now;
use crate::models::{Business, Role, User};
use crate::state::AppState;

// GET /api/admin/users
#[derive(Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<UsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    ensure_admin(&user)?;

    let role = match query.role.as_deref() {
        None | Some("") => None,
        Some(r) => Some(parse_role(r)?),
    };

    let db = state.db()?;
    Ok(Json(queries::list_users(&db, role)?))
}

// GET /api/admin/businesses
pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Business>>> {
    ensure_admin(&user)?;
    let db = state.db()?;
    Ok(Json(queries::list_businesses(&db)?))
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    clients: i64,
    owners: i64,
    admins: i64,
    businesses: i64,
    upcoming_bookings: i64,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<StatsResponse>> {
    ensure_admin(&user)?;

    let stats = {
        let db = state.db()?;
        queries::get_platform_stats(&db, &local_now())?
    };

    Ok(Json(StatsResponse {
        clients: stats.clients,
        owners: stats.owners,
        admins: stats.admins,
        businesses: stats.businesses,
        upcoming_bookings: stats.upcoming_bookings,
    }))
}

fn parse_role(s: &str) -> Result<Role, AppError> {
    Role::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown role: {s}")))
}

/// Writes the role and drops the target's sessions so the new role applies
/// from their next sign-in.
fn assign_role(
    state: &AppState,
    caller: &CurrentUser,
    target_user_id: &str,
    role: Role,
) -> AppResult<User> {
    ensure_admin(caller)?;

    let db = state.db()?;
    if !queries::update_user_role(&db, target_user_id, role)? {
        return Err(AppError::NotFound("user".into()));
    }
    let revoked = queries::delete_sessions_for_user(&db, target_user_id)?;

    tracing::info!(
        caller = %caller.user_id,
        target = %target_user_id,
        role = role.as_str(),
        revoked_sessions = revoked,
        "role assigned"
    );

    queries::get_user(&db, target_user_id)?.ok_or_else(|| AppError::NotFound("user".into()))
}

// POST /api/admin/assign-admin-role
#[derive(Deserialize)]
pub struct AssignAdminRoleRequest {
    pub target_user_id: String,
}

pub async fn assign_admin_role(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<AssignAdminRoleRequest>,
) -> AppResult<Json<User>> {
    let target = assign_role(&state, &user, &body.target_user_id, Role::Admin)?;
    Ok(Json(target))
}

// POST /api/admin/assign-user-role
#[derive(Deserialize)]
pub struct AssignUserRoleRequest {
    pub target_user_id: String,
    pub role: String,
}

pub async fn assign_user_role(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<AssignUserRoleRequest>,
) -> AppResult<Json<User>> {
    ensure_admin(&user)?;
    let role = parse_role(&body.role)?;
    let target = assign_role(&state, &user, &body.target_user_id, role)?;
    Ok(Json(target))
}
