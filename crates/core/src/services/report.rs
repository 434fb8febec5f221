//! Report service with rolling-window throttling.

use chrono::{Duration, Utc};
use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::{
        notification::NotificationType,
        report::{self, ReportStatus},
    },
    repositories::{ReportRepository, UserRepository},
};
use sea_orm::Set;
use validator::Validate;

use crate::services::notification::NotificationService;

/// A reporter gets one report per target per rolling window.
const THROTTLE_WINDOW_HOURS: i64 = 24;

/// Input for submitting a report.
#[derive(Debug, Clone, Validate)]
pub struct SubmitReportInput {
    pub target_user_id: String,
    pub target_post_id: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub reason: String,
    #[validate(length(max = 4096))]
    pub description: Option<String>,
}

/// Result of a report submission.
///
/// A throttled submission is not an error: the API returns it as a
/// normal response with `throttled` set.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: Option<report::Model>,
    pub throttled: bool,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(
        report_repo: ReportRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            report_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit a report against a user.
    ///
    /// At most one report per (reporter, target) pair is accepted within a
    /// rolling 24-hour window; a second submission inside the window
    /// returns `throttled: true` without creating a record.
    pub async fn submit(
        &self,
        reporter_id: &str,
        input: SubmitReportInput,
    ) -> AppResult<ReportOutcome> {
        input.validate()?;

        if reporter_id == input.target_user_id {
            return Err(AppError::BadRequest("Cannot report yourself".to_string()));
        }

        self.user_repo.get_by_id(&input.target_user_id).await?;

        let since = Utc::now() - Duration::hours(THROTTLE_WINDOW_HOURS);
        let recent = self
            .report_repo
            .find_recent_by_pair(reporter_id, &input.target_user_id, since)
            .await?;

        if recent.is_some() {
            return Ok(ReportOutcome {
                report: None,
                throttled: true,
            });
        }

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter_id.to_string()),
            target_user_id: Set(input.target_user_id.clone()),
            target_post_id: Set(input.target_post_id),
            reason: Set(input.reason),
            description: Set(input.description),
            status: Set(ReportStatus::Open),
            ..Default::default()
        };

        let created = self.report_repo.create(model).await?;

        if let Err(e) = self
            .notification_service
            .notify(
                reporter_id,
                None,
                NotificationType::Report,
                "Your report was received and will be reviewed",
                None,
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to create report confirmation notification");
        }

        tracing::info!(
            report_id = %created.id,
            target_user_id = %created.target_user_id,
            "report submitted"
        );

        Ok(ReportOutcome {
            report: Some(created),
            throttled: false,
        })
    }

    /// List reports for the moderation queue. Admin only.
    pub async fn list(
        &self,
        actor_id: &str,
        status: Option<ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        self.require_admin(actor_id).await?;
        self.report_repo.list(status, limit, offset).await
    }

    /// Mark a report reviewed and notify the reporter. Admin only.
    pub async fn review(&self, actor_id: &str, report_id: &str) -> AppResult<report::Model> {
        self.require_admin(actor_id).await?;

        let existing = self.report_repo.get_by_id(report_id).await?;
        if existing.status == ReportStatus::Reviewed {
            return Err(AppError::BadRequest("Report already reviewed".to_string()));
        }

        let reporter_id = existing.reporter_id.clone();
        let mut active: report::ActiveModel = existing.into();
        active.status = Set(ReportStatus::Reviewed);
        active.reviewer_id = Set(Some(actor_id.to_string()));
        active.reviewed_at = Set(Some(Utc::now().into()));

        let updated = self.report_repo.update(active).await?;

        if let Err(e) = self
            .notification_service
            .notify(
                &reporter_id,
                None,
                NotificationType::Report,
                "Your report has been reviewed",
                None,
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to create report review notification");
        }

        Ok(updated)
    }

    async fn require_admin(&self, actor_id: &str) -> AppResult<()> {
        let actor = self.user_repo.get_by_id(actor_id).await?;
        if !actor.is_admin {
            return Err(AppError::Forbidden("Admin privileges required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rhythme_db::entities::{notification, user};
    use rhythme_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            token: Some("token".to_string()),
            name: None,
            bio: None,
            avatar_url: None,
            google_id: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            is_admin,
            is_deactivated: false,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_report(id: &str, reporter_id: &str, target_user_id: &str) -> report::Model {
        report::Model {
            id: id.to_string(),
            reporter_id: reporter_id.to_string(),
            target_user_id: target_user_id.to_string(),
            target_post_id: None,
            reason: "spam".to_string(),
            description: None,
            status: ReportStatus::Open,
            reviewer_id: None,
            reviewed_at: None,
            created_at: Utc::now().into(),
        }
    }

    fn build_service(
        report_db: MockDatabase,
        user_db: MockDatabase,
        notification_db: MockDatabase,
    ) -> ReportService {
        ReportService::new(
            ReportRepository::new(Arc::new(report_db.into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
            NotificationService::new(NotificationRepository::new(Arc::new(
                notification_db.into_connection(),
            ))),
        )
    }

    fn create_test_notification(id: &str, notifiee_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            notifiee_id: notifiee_id.to_string(),
            notifier_id: None,
            notification_type: NotificationType::Report,
            message: "Your report was received and will be reviewed".to_string(),
            post_id: None,
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    fn submit_input(target: &str) -> SubmitReportInput {
        SubmitReportInput {
            target_user_id: target.to_string(),
            target_post_id: None,
            reason: "spam".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_report_yourself_returns_error() {
        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.submit("user1", submit_input("user1")).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_second_report_in_window_is_throttled() {
        let recent = create_test_report("r1", "user1", "user2");

        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[recent]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("user2", false)]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let outcome = service
            .submit("user1", submit_input("user2"))
            .await
            .unwrap();

        assert!(outcome.throttled);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn test_submit_with_no_recent_report_creates_one() {
        // No report inside the window (an older one is filtered out by the
        // repository's `since` bound), so the submission goes through.
        let created = create_test_report("r2", "user1", "user2");

        let report_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<report::Model>::new()])
            .append_query_results([[created]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("user2", false)]]);
        let notification_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_notification("n1", "user1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);

        let service = build_service(report_db, user_db, notification_db);

        let outcome = service
            .submit("user1", submit_input("user2"))
            .await
            .unwrap();

        assert!(!outcome.throttled);
        let report = outcome.report.unwrap();
        assert_eq!(report.id, "r2");
        assert_eq!(report.status, ReportStatus::Open);
    }

    #[tokio::test]
    async fn test_review_marks_reviewed_and_notifies_reporter() {
        let open = create_test_report("r1", "user1", "user2");
        let mut reviewed = open.clone();
        reviewed.status = ReportStatus::Reviewed;
        reviewed.reviewer_id = Some("admin".to_string());
        reviewed.reviewed_at = Some(Utc::now().into());

        let report_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[open]])
            .append_query_results([[reviewed]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("admin", true)]]);
        let notification_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_notification("n1", "user1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);

        let service = build_service(report_db, user_db, notification_db);

        let result = service.review("admin", "r1").await.unwrap();

        assert_eq!(result.status, ReportStatus::Reviewed);
        assert_eq!(result.reviewer_id.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_list_requires_admin() {
        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("user1", false)]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.list("user1", None, 30, 0).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
