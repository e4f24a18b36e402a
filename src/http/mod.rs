use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminUser, AuthUser, ServiceToken};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::profiles())
        .merge(routes::incidents())
        .merge(routes::admin())
        .merge(routes::notifications());

    Router::new()
        .merge(routes::health())
        .nest("/v1", api)
        .with_state(state)
}
