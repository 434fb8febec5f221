//! API endpoints.

mod admin;
mod auth;
mod messaging;
mod notifications;
mod posts;
mod reports;
mod spotify;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/posts", posts::router())
        .nest("/notifications", notifications::router())
        .nest("/messaging", messaging::router())
        .nest("/spotify", spotify::router())
        .nest("/reports", reports::router())
        .nest("/admin", admin::router())
}
