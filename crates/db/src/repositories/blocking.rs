//! Block graph repository.

use std::sync::Arc;

use crate::entities::{Blocking, blocking};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect,
};

/// Blocking repository for database operations.
#[derive(Clone)]
pub struct BlockingRepository {
    db: Arc<DatabaseConnection>,
}

impl BlockingRepository {
    /// Create a new blocking repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a block edge by (blocker, blockee) pair.
    pub async fn find_by_pair(
        &self,
        blocker_id: &str,
        blockee_id: &str,
    ) -> AppResult<Option<blocking::Model>> {
        Blocking::find()
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .filter(blocking::Column::BlockeeId.eq(blockee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether `blocker_id` blocks `blockee_id`.
    pub async fn is_blocking(&self, blocker_id: &str, blockee_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(blocker_id, blockee_id).await?.is_some())
    }

    /// Check whether a block exists in either direction between two users.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        let condition = Condition::any()
            .add(
                Condition::all()
                    .add(blocking::Column::BlockerId.eq(user_a))
                    .add(blocking::Column::BlockeeId.eq(user_b)),
            )
            .add(
                Condition::all()
                    .add(blocking::Column::BlockerId.eq(user_b))
                    .add(blocking::Column::BlockeeId.eq(user_a)),
            );

        let found = Blocking::find()
            .filter(condition)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.is_some())
    }

    /// Create a block edge.
    pub async fn create(&self, model: blocking::ActiveModel) -> AppResult<blocking::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a block edge by (blocker, blockee) pair.
    pub async fn delete_by_pair(&self, blocker_id: &str, blockee_id: &str) -> AppResult<()> {
        Blocking::delete_many()
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .filter(blocking::Column::BlockeeId.eq(blockee_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// IDs of users blocked by `user_id`.
    pub async fn find_blockee_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Blocking::find()
            .filter(blocking::Column::BlockerId.eq(user_id))
            .select_only()
            .column(blocking::Column::BlockeeId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_is_blocked_between_found() {
        let edge = blocking::Model {
            id: "b1".to_string(),
            blocker_id: "user2".to_string(),
            blockee_id: "user1".to_string(),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge]])
                .into_connection(),
        );

        let repo = BlockingRepository::new(db);
        assert!(repo.is_blocked_between("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_blocked_between_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blocking::Model>::new()])
                .into_connection(),
        );

        let repo = BlockingRepository::new(db);
        assert!(!repo.is_blocked_between("user1", "user2").await.unwrap());
    }
}
