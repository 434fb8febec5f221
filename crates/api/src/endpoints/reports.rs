//! User reporting endpoints.
//!
//! The moderation queue (listing and review) lives under the admin
//! router; this one only takes submissions.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_core::{ReportOutcome, SubmitReportInput};
use rhythme_db::entities::report::{Model as ReportModel, ReportStatus};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Report representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub target_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_post_id: Option<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

impl From<ReportModel> for ReportResponse {
    fn from(r: ReportModel) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            target_user_id: r.target_user_id,
            target_post_id: r.target_post_id,
            reason: r.reason,
            description: r.description,
            status: r.status,
            reviewer_id: r.reviewer_id,
            reviewed_at: r.reviewed_at.map(|t| t.to_rfc3339()),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Submit report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    pub target_user_id: String,
    pub target_post_id: Option<String>,
    pub reason: String,
    pub description: Option<String>,
}

/// Submit outcome. `throttled` is set when a duplicate report against
/// the same user within the rolling window was suppressed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportResponse>,
    pub throttled: bool,
}

impl From<ReportOutcome> for SubmitReportResponse {
    fn from(o: ReportOutcome) -> Self {
        Self {
            report: o.report.map(Into::into),
            throttled: o.throttled,
        }
    }
}

/// Report a user or one of their posts.
async fn submit_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SubmitReportRequest>,
) -> AppResult<ApiResponse<SubmitReportResponse>> {
    let outcome = state
        .report_service
        .submit(
            &user.id,
            SubmitReportInput {
                target_user_id: req.target_user_id,
                target_post_id: req.target_post_id,
                reason: req.reason,
                description: req.description,
            },
        )
        .await?;
    Ok(ApiResponse::ok(outcome.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/submit", post(submit_report))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_throttled_response_omits_report() {
        let response = SubmitReportResponse::from(ReportOutcome {
            report: None,
            throttled: true,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("report").is_none());
        assert_eq!(json["throttled"], true);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ReportModel {
            id: "r1".to_string(),
            reporter_id: "u1".to_string(),
            target_user_id: "u2".to_string(),
            target_post_id: Some("p1".to_string()),
            reason: "spam".to_string(),
            description: None,
            status: ReportStatus::Open,
            reviewer_id: None,
            reviewed_at: None,
            created_at: Utc::now().into(),
        };

        let json = serde_json::to_value(ReportResponse::from(report)).unwrap();
        assert_eq!(json["targetUserId"], "u2");
        assert_eq!(json["status"], "open");
        assert!(json.get("reviewerId").is_none());
    }
}
