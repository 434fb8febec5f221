//! Spotify account linking and catalog search endpoints.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_core::SpotifyItem;
use rhythme_db::entities::spotify_account::Model as SpotifyAccountModel;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Authorize URL request. `state` is an opaque CSRF token chosen by the
/// client and echoed back on the callback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeUrlRequest {
    pub state: String,
}

/// Authorize URL response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeUrlResponse {
    pub url: String,
}

/// Build the Spotify authorization URL for account linking.
async fn authorize_url(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AuthorizeUrlRequest>,
) -> AppResult<ApiResponse<AuthorizeUrlResponse>> {
    let url = state.spotify_service.authorize_url(&req.state)?;
    Ok(ApiResponse::ok(AuthorizeUrlResponse { url }))
}

/// Connect request carrying the authorization code from the callback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub code: String,
}

/// Linked account response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyAccountResponse {
    pub spotify_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub linked_at: String,
}

impl From<SpotifyAccountModel> for SpotifyAccountResponse {
    fn from(a: SpotifyAccountModel) -> Self {
        Self {
            spotify_user_id: a.spotify_user_id,
            display_name: a.display_name,
            linked_at: a.created_at.to_rfc3339(),
        }
    }
}

/// Exchange the authorization code and link the Spotify account.
async fn connect(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> AppResult<ApiResponse<SpotifyAccountResponse>> {
    let account = state.spotify_service.connect(&user.id, &req.code).await?;
    Ok(ApiResponse::ok(account.into()))
}

/// Unlink the Spotify account.
async fn disconnect(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.spotify_service.disconnect(&user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// The linked Spotify account, if any. Refreshes the stored token when
/// expired, unlinking on refresh failure.
async fn account(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Option<SpotifyAccountResponse>>> {
    let account = state.spotify_service.linked_account(&user.id).await?;
    Ok(ApiResponse::ok(account.map(Into::into)))
}

/// Catalog search request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    /// One of "track", "artist", "album".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_search_limit")]
    pub limit: u8,
}

const fn default_search_limit() -> u8 {
    20
}

/// Search the Spotify catalog.
async fn search(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> AppResult<ApiResponse<Vec<SpotifyItem>>> {
    let items = state
        .spotify_service
        .search(&req.query, &req.kind, req.limit)
        .await?;
    Ok(ApiResponse::ok(items))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authorize-url", post(authorize_url))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/account", post(account))
        .route("/search", post(search))
}
