//! Admin moderation endpoints.
//!
//! Every operation here re-checks the admin flag in the service layer;
//! the routes only shape requests and responses.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_db::entities::report::ReportStatus;
use serde::Deserialize;

use super::reports::ReportResponse;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// List reports request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsRequest {
    pub status: Option<ReportStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    30
}

/// List reports for the moderation queue.
async fn list_reports(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListReportsRequest>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let limit = req.limit.min(100);
    let reports = state
        .report_service
        .list(&user.id, req.status, limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(
        reports.into_iter().map(Into::into).collect(),
    ))
}

/// Review request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportRequest {
    pub report_id: String,
}

/// Mark a report reviewed.
async fn review_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReviewReportRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .report_service
        .review(&user.id, &req.report_id)
        .await?;
    Ok(ApiResponse::ok(report.into()))
}

/// Delete post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostRequest {
    pub post_id: String,
}

/// Remove a post as a moderator.
async fn delete_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeletePostRequest>,
) -> AppResult<ApiResponse<()>> {
    state.post_service.delete(&user.id, &req.post_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Delete user request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    pub user_id: String,
}

/// Hard-delete a user account and all of its rows.
async fn delete_user(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteUserRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .account_service
        .hard_delete(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/list", post(list_reports))
        .route("/reports/review", post(review_report))
        .route("/posts/delete", post(delete_post))
        .route("/users/delete", post(delete_user))
}
