//! Notification endpoints.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_db::entities::notification::Model as NotificationModel;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// List notifications request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
}

const fn default_limit() -> u64 {
    20
}

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifier_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type.as_str().to_string(),
            notifier_id: n.notifier_id,
            post_id: n.post_id,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Notifications for the authenticated user, newest first.
async fn list_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let limit = req.limit.min(100);
    let notifications = state
        .notification_service
        .list(&user.id, limit, req.until_id.as_deref(), req.unread_only)
        .await?;
    Ok(ApiResponse::ok(
        notifications.into_iter().map(Into::into).collect(),
    ))
}

/// Mark as read request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub notification_id: String,
}

/// Mark a single notification as read.
async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkAsReadRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .mark_as_read(&req.notification_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: u64,
}

/// Mark all notifications as read.
async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.mark_all_as_read(&user.id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

/// Count unread notifications.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.count_unread(&user.id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list_notifications))
        .route("/mark-as-read", post(mark_as_read))
        .route("/mark-all-as-read", post(mark_all_as_read))
        .route("/unread-count", post(unread_count))
}
