//! Post repository, including like and comment rows (one aggregate).

use std::sync::Arc;

use crate::entities::{Post, PostComment, PostLike, post, post_comment, post_like};
use chrono::{DateTime, Utc};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let post = self.get_by_id(id).await?;
        post.delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Posts authored by a single user, newest first.
    pub async fn find_by_author(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut condition = Condition::all().add(post::Column::UserId.eq(user_id));

        if let Some(until) = until_id {
            condition = condition.add(post::Column::Id.lt(until));
        }

        Post::find()
            .filter(condition)
            .order_by_desc(post::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Posts authored by any of the given users, newest first.
    ///
    /// Used for the home feed (followed authors + self) and for deriving
    /// fallback genre preferences from followed users' posts.
    pub async fn find_by_authors(
        &self,
        user_ids: &[String],
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut condition = Condition::all().add(post::Column::UserId.is_in(user_ids.to_vec()));

        if let Some(until) = until_id {
            condition = condition.add(post::Column::Id.lt(until));
        }

        Post::find()
            .filter(condition)
            .order_by_desc(post::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Recommendation candidates: recent posts NOT authored by any of the
    /// excluded users, newest first.
    ///
    /// Genre filtering happens in the service layer (the genre tags live
    /// inside the JSONB descriptor), so the fetch cap is applied after it.
    pub async fn find_recent_excluding_authors(
        &self,
        exclude_user_ids: &[String],
        since: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<post::Model>> {
        let mut condition = Condition::all().add(post::Column::CreatedAt.gte(since));

        if !exclude_user_ids.is_empty() {
            condition =
                condition.add(post::Column::UserId.is_not_in(exclude_user_ids.to_vec()));
        }

        Post::find()
            .filter(condition)
            .order_by_desc(post::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment likes count atomically (single UPDATE query, no fetch).
    pub async fn increment_likes_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikesCount,
                Expr::col(post::Column::LikesCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement likes count atomically (single UPDATE query, no fetch).
    pub async fn decrement_likes_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikesCount,
                Expr::cust("GREATEST(likes_count - 1, 0)"),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment comments count atomically (single UPDATE query, no fetch).
    pub async fn increment_comments_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::CommentsCount,
                Expr::col(post::Column::CommentsCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ========== Likes ==========

    /// Find a like by (post, user) pair.
    pub async fn find_like(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<post_like::Model>> {
        PostLike::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a like row.
    pub async fn create_like(&self, model: post_like::ActiveModel) -> AppResult<post_like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a like row by (post, user) pair.
    pub async fn delete_like(&self, post_id: &str, user_id: &str) -> AppResult<()> {
        PostLike::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ========== Comments ==========

    /// Create a comment row.
    pub async fn create_comment(
        &self,
        model: post_comment::ActiveModel,
    ) -> AppResult<post_comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments on a post, oldest first.
    pub async fn find_comments(
        &self,
        post_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post_comment::Model>> {
        PostComment::find()
            .filter(post_comment::Column::PostId.eq(post_id))
            .order_by_asc(post_comment::Column::Id)
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
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};
    use std::sync::Arc;

    fn create_test_post(id: &str, user_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            text: "hello".to_string(),
            image_url: None,
            spotify_content: None,
            likes_count: 0,
            comments_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_authors_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = PostRepository::new(db);
        let result = repo.find_by_authors(&[], 10, None).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_like_missing_returns_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post_like::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_like("p1", "u1").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_create_comment() {
        let comment = post_comment::Model {
            id: "c1".to_string(),
            post_id: "p1".to_string(),
            user_id: "u1".to_string(),
            text: "nice track".to_string(),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PostRepository::new(db);

        let active = post_comment::ActiveModel {
            id: Set("c1".to_string()),
            post_id: Set("p1".to_string()),
            user_id: Set("u1".to_string()),
            text: Set("nice track".to_string()),
            created_at: Set(Utc::now().into()),
        };

        let result = repo.create_comment(active).await.unwrap();
        assert_eq!(result.text, "nice track");
    }

    #[tokio::test]
    async fn test_find_recent_excluding_authors_returns_rows() {
        let p = create_test_post("p1", "u3");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo
            .find_recent_excluding_authors(
                &["u1".to_string(), "u2".to_string()],
                Utc::now() - chrono::Duration::days(30),
                25,
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].user_id, "u3");
    }

    #[tokio::test]
    async fn test_find_recent_excluding_authors_filters_in_sql() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        {
            let repo = PostRepository::new(Arc::clone(&db));
            repo.find_recent_excluding_authors(
                &["u1".to_string(), "u2".to_string()],
                Utc::now() - chrono::Duration::days(30),
                25,
            )
            .await
            .unwrap();
        }

        let conn = Arc::try_unwrap(db).unwrap();
        let log = format!("{:?}", conn.into_transaction_log());
        assert!(log.contains("NOT IN"));
        assert!(log.contains("u1"));
        assert!(log.contains("u2"));
    }
}
