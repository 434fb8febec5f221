//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use rhythme_core::{
    AccountService, BlockingService, FollowingService, MessagingService, NotificationService,
    PostService, RecommendationService, ReportService, SpotifyService, UserService,
};

use crate::streaming::StreamingState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub user_service: UserService,
    pub following_service: FollowingService,
    pub blocking_service: BlockingService,
    pub post_service: PostService,
    pub recommendation_service: RecommendationService,
    pub messaging_service: MessagingService,
    pub notification_service: NotificationService,
    pub report_service: ReportService,
    pub spotify_service: SpotifyService,
    pub streaming: StreamingState,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and stores it in request extensions
/// for the [`crate::extractors::AuthUser`] extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
