use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use password_hash::rand_core::OsRng;
use rusqlite::Connection;
use sha1::Sha1;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, Session, User};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn signature(secret: &str, session_id: &str) -> Option<Hmac<Sha1>> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    Some(mac)
}

/// Token handed to clients: `<session id>.<base64 HMAC-SHA1 of the id>`.
pub fn sign_token(secret: &str, session_id: &str) -> String {
    let sig = signature(secret, session_id)
        .map(|mac| mac.finalize().into_bytes())
        .map(|bytes| base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
        .unwrap_or_default();
    format!("{session_id}.{sig}")
}

/// Returns the session id if the token's signature matches.
pub fn verify_token<'a>(secret: &str, token: &'a str) -> Option<&'a str> {
    let (session_id, sig) = token.rsplit_once('.')?;
    let expected = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(sig)
        .ok()?;
    signature(secret, session_id)?
        .verify_slice(&expected)
        .ok()?;
    Some(session_id)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(email: &str, password: &str) -> Result<(), AppError> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Argon2 runs on the blocking pool, outside the database lock.
async fn hash_off_thread(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)?
}

async fn verify_off_thread(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(ok)
}

pub async fn register(
    state: &AppState,
    email: &str,
    password: &str,
    display_name: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    validate_registration(&email, password)?;

    let taken = || AppError::Conflict("email is already registered".into());
    {
        let db = state.db()?;
        if queries::get_user_by_email(&db, &email)?.is_some() {
            return Err(taken());
        }
    }

    let display_name = match display_name.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        name => name.to_string(),
    };

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        display_name,
        role: Role::Client,
        password_hash: hash_off_thread(password).await?,
        created_at: Utc::now().naive_utc(),
    };

    {
        // Re-check: another registration may have won while hashing
        let db = state.db()?;
        if queries::get_user_by_email(&db, &user.email)?.is_some() {
            return Err(taken());
        }
        queries::create_user(&db, &user)?;
    }

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Checks credentials and opens a session. Returns the signed token.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(String, User), AppError> {
    let invalid = || AppError::Unauthorized;

    let email = normalize_email(email);
    let found = {
        let db = state.db()?;
        queries::get_user_by_email(&db, &email)?
    };
    let user = found.ok_or_else(invalid)?;

    if !verify_off_thread(password, &user.password_hash).await? {
        tracing::warn!(user_id = %user.id, "failed login");
        return Err(invalid());
    }

    let now = Utc::now().naive_utc();
    let expires_at = Duration::try_hours(state.config.session_ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session ttl out of range")))?;
    let session = Session {
        id: uuid::Uuid::new_v4().simple().to_string(),
        user_id: user.id.clone(),
        created_at: now,
        expires_at,
    };
    {
        let db = state.db()?;
        queries::create_session(&db, &session)?;
    }

    tracing::info!(user_id = %user.id, "session opened");
    Ok((sign_token(&state.config.session_secret, &session.id), user))
}

/// Resolves a bearer token to its session and user. Forged, expired, or
/// signed-out tokens resolve to `None`.
pub fn resolve_token(
    conn: &Connection,
    secret: &str,
    token: &str,
) -> anyhow::Result<Option<(Session, User)>> {
    let Some(session_id) = verify_token(secret, token) else {
        return Ok(None);
    };
    let Some(session) = queries::get_active_session(conn, session_id)? else {
        return Ok(None);
    };
    let Some(user) = queries::get_user(conn, &session.user_id)? else {
        return Ok(None);
    };
    Ok(Some((session, user)))
}

pub fn logout(conn: &Connection, session_id: &str) -> anyhow::Result<()> {
    queries::delete_session(conn, session_id)?;
    Ok(())
}

/// Promotes an existing account to admin at startup so a fresh install has
/// someone able to call the role-assignment endpoints.
pub fn bootstrap_admin(conn: &Connection, email: &str) -> anyhow::Result<bool> {
    let Some(user) = queries::get_user_by_email(conn, &normalize_email(email))? else {
        tracing::warn!(email = %email, "bootstrap admin account not found");
        return Ok(false);
    };
    if user.role == Role::Admin {
        return Ok(false);
    }
    queries::update_user_role(conn, &user.id, Role::Admin)?;
    tracing::info!(user_id = %user.id, "bootstrap admin promoted");
    Ok(true)
}
