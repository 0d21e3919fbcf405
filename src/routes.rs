use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Every route of the service. Middleware layers are added by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        // Client booking
        .route("/api/businesses", get(handlers::businesses::list_businesses))
        .route("/api/businesses/:id", get(handlers::businesses::get_business))
        .route("/api/businesses/:id/slots", get(handlers::businesses::get_slots))
        .route(
            "/api/bookings",
            get(handlers::bookings::list_my_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route("/api/bookings/:id/ics", get(handlers::calendar::download_ics))
        // Owner console
        .route(
            "/api/owner/business",
            get(handlers::owner::get_business)
                .post(handlers::owner::create_business)
                .put(handlers::owner::update_business),
        )
        .route(
            "/api/owner/services",
            get(handlers::owner::list_services).post(handlers::owner::create_service),
        )
        .route(
            "/api/owner/services/:id",
            put(handlers::owner::update_service).delete(handlers::owner::archive_service),
        )
        .route(
            "/api/owner/bookings",
            get(handlers::owner::list_bookings).post(handlers::owner::create_manual_booking),
        )
        .route(
            "/api/owner/bookings/:id/cancel",
            post(handlers::owner::cancel_booking),
        )
        .route("/api/owner/events", get(handlers::events::owner_events))
        // Admin console
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route("/api/admin/businesses", get(handlers::admin::list_businesses))
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route(
            "/api/admin/assign-admin-role",
            post(handlers::admin::assign_admin_role),
        )
        .route(
            "/api/admin/assign-user-role",
            post(handlers::admin::assign_user_role),
        )
        .with_state(state)
}
