//! Follow graph repository.

use std::sync::Arc;

use crate::entities::{Following, following};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow edge by (follower, followee) pair.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<following::Model>> {
        Following::find()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether `follower_id` follows `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, followee_id).await?.is_some())
    }

    /// Create a follow edge.
    pub async fn create(&self, model: following::ActiveModel) -> AppResult<following::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a follow edge by (follower, followee) pair.
    pub async fn delete_by_pair(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        Following::delete_many()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// IDs of users that `user_id` follows.
    pub async fn find_followee_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .select_only()
            .column(following::Column::FolloweeId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of users that follow `user_id`.
    pub async fn find_follower_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Following::find()
            .filter(following::Column::FolloweeId.eq(user_id))
            .select_only()
            .column(following::Column::FollowerId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All follow edges whose follower is in `follower_ids`.
    ///
    /// Used to walk the graph one hop further out (followees of followees)
    /// in a single query.
    pub async fn find_edges_from(
        &self,
        follower_ids: &[String],
    ) -> AppResult<Vec<following::Model>> {
        if follower_ids.is_empty() {
            return Ok(vec![]);
        }

        Following::find()
            .filter(following::Column::FollowerId.is_in(follower_ids.to_vec()))
            .order_by_asc(following::Column::Id)
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

    fn create_test_edge(id: &str, follower: &str, followee: &str) -> following::Model {
        following::Model {
            id: id.to_string(),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_is_following_true() {
        let edge = create_test_edge("f1", "user1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(repo.is_following("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_following_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(!repo.is_following("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_edges_from_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = FollowingRepository::new(db);
        let result = repo.find_edges_from(&[]).await.unwrap();

        assert!(result.is_empty());
    }
}
