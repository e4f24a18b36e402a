use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn profiles() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(handlers::register_profile))
        .route(
            "/profiles/me",
            get(handlers::get_my_profile).patch(handlers::update_my_profile),
        )
}

pub fn incidents() -> Router<AppState> {
    Router::new()
        .route("/incidents", post(handlers::report_incident))
        .route("/incidents/mine", get(handlers::list_my_incidents))
        .route("/incidents/locality", get(handlers::list_locality_incidents))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/profiles", get(handlers::list_profiles))
        .route("/admin/profiles/:id/admin", post(handlers::set_admin_flag))
        .route(
            "/admin/incidents/pending",
            get(handlers::list_pending_incidents),
        )
        .route(
            "/admin/incidents/:id/status",
            post(handlers::update_incident_status),
        )
}

pub fn notifications() -> Router<AppState> {
    Router::new().route("/notifications/locality", post(handlers::notify_locality))
}
