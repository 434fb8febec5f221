//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a notification row.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Notifications for a user, newest first, optionally before a given id
    /// and optionally unread only.
    pub async fn find_by_notifiee(
        &self,
        notifiee_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let mut condition = Condition::all().add(notification::Column::NotifieeId.eq(notifiee_id));

        if let Some(until) = until_id {
            condition = condition.add(notification::Column::Id.lt(until));
        }

        if unread_only {
            condition = condition.add(notification::Column::IsRead.eq(false));
        }

        Notification::find()
            .filter(condition)
            .order_by_desc(notification::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a single notification as read. Scoped to the owner so one user
    /// cannot flip another user's notifications.
    pub async fn mark_as_read(&self, id: &str, notifiee_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, true.into())
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Mark all of a user's unread notifications as read.
    pub async fn mark_all_as_read(&self, notifiee_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, true.into())
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count a user's unread notifications.
    pub async fn count_unread(&self, notifiee_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a notification row.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Notification::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_notification(id: &str, notifiee: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            notifiee_id: notifiee.to_string(),
            notifier_id: Some("user2".to_string()),
            notification_type: NotificationType::Like,
            message: "user2 liked your post".to_string(),
            post_id: Some("p1".to_string()),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_notifiee() {
        let n = create_test_notification("n1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo
            .find_by_notifiee("user1", 20, None, false)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].notification_type, NotificationType::Like);
    }

    #[tokio::test]
    async fn test_mark_as_read_scoped_to_owner() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let affected = repo.mark_as_read("n1", "someone_else").await.unwrap();

        assert_eq!(affected, 0);
    }
}
