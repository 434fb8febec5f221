//! Report repository.

use std::sync::Arc;

use crate::entities::{Report, report};
use chrono::{DateTime, Utc};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("report {id} not found")))
    }

    /// Create a report row.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a report row (review resolution).
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent report by this reporter against this target since the
    /// given instant. Drives the rolling throttle window.
    pub async fn find_recent_by_pair(
        &self,
        reporter_id: &str,
        target_user_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Option<report::Model>> {
        Report::find()
            .filter(report::Column::ReporterId.eq(reporter_id))
            .filter(report::Column::TargetUserId.eq(target_user_id))
            .filter(report::Column::CreatedAt.gte(since))
            .order_by_desc(report::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List reports, optionally filtered by status, newest first.
    pub async fn list(
        &self,
        status: Option<report::ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        let mut condition = Condition::all();

        if let Some(status) = status {
            condition = condition.add(report::Column::Status.eq(status));
        }

        Report::find()
            .filter(condition)
            .order_by_desc(report::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::report::ReportStatus;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_report(id: &str) -> report::Model {
        report::Model {
            id: id.to_string(),
            reporter_id: "user1".to_string(),
            target_user_id: "user2".to_string(),
            target_post_id: None,
            reason: "spam".to_string(),
            description: None,
            status: ReportStatus::Open,
            reviewer_id: None,
            reviewed_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_recent_by_pair_found() {
        let r = create_test_report("r1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let since = Utc::now() - chrono::Duration::hours(24);
        let result = repo
            .find_recent_by_pair("user1", "user2", since)
            .await
            .unwrap();

        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_find_recent_by_pair_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report::Model>::new()])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let since = Utc::now() - chrono::Duration::hours(24);
        let result = repo
            .find_recent_by_pair("user1", "user2", since)
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
