//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Permanently delete a user row.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let user = self.get_by_id(id).await?;
        user.delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment posts count atomically (single UPDATE query, no fetch).
    pub async fn increment_posts_count(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::PostsCount,
                Expr::col(user::Column::PostsCount).add(1),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement posts count atomically (single UPDATE query, no fetch).
    pub async fn decrement_posts_count(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::PostsCount,
                Expr::cust("GREATEST(posts_count - 1, 0)"),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment followers count atomically (single UPDATE query, no fetch).
    pub async fn increment_followers_count(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::FollowersCount,
                Expr::col(user::Column::FollowersCount).add(1),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement followers count atomically (single UPDATE query, no fetch).
    pub async fn decrement_followers_count(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::FollowersCount,
                Expr::cust("GREATEST(followers_count - 1, 0)"),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment following count atomically (single UPDATE query, no fetch).
    pub async fn increment_following_count(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::FollowingCount,
                Expr::col(user::Column::FollowingCount).add(1),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement following count atomically (single UPDATE query, no fetch).
    pub async fn decrement_following_count(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::FollowingCount,
                Expr::cust("GREATEST(following_count - 1, 0)"),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Search users by username or display name.
    pub async fn search(&self, query: &str, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        use sea_orm::Condition;

        let escaped = escape_like(query);
        let name_pattern = format!("%{escaped}%");
        let username_pattern = format!("%{}%", escaped.to_lowercase());

        let condition = Condition::all()
            .add(user::Column::IsDeactivated.eq(false))
            .add(user::Column::DeletedAt.is_null())
            .add(
                Condition::any()
                    .add(user::Column::UsernameLower.like(username_pattern))
                    .add(user::Column::Name.like(name_pattern)),
            );

        User::find()
            .filter(condition)
            .order_by_desc(user::Column::FollowersCount)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            token: Some("test_token".to_string()),
            name: Some("Test User".to_string()),
            bio: None,
            avatar_url: None,
            google_id: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            is_admin: false,
            is_deactivated: false,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "testuser");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        assert!(result.is_some());
        let found_user = result.unwrap();
        assert_eq!(found_user.id, "user1");
        assert_eq!(found_user.username, "testuser");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("nonexistent").await;

        assert!(result.is_err());
        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "nonexistent"),
            _ => panic!("Expected UserNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_by_token() {
        let user = create_test_user("user1", "testuser");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_token("test_token").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().token, Some("test_token".to_string()));
    }

    #[tokio::test]
    async fn test_create_user() {
        let user = create_test_user("user1", "newuser");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);

        let active = user::ActiveModel {
            id: Set("user1".to_string()),
            username: Set("newuser".to_string()),
            username_lower: Set("newuser".to_string()),
            ..Default::default()
        };

        let result = repo.create(active).await.unwrap();
        assert_eq!(result.username, "newuser");
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards_in_both_patterns() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        {
            let repo = UserRepository::new(Arc::clone(&db));
            repo.search("100%", 20, 0).await.unwrap();
        }

        let conn = Arc::try_unwrap(db).unwrap();
        // Bound values are rendered with Debug escaping, so the single
        // backslash in the pattern shows up doubled.
        let log = format!("{:?}", conn.into_transaction_log());
        assert!(log.contains(r"%100\\%%"));
        assert!(!log.contains(r#""%100%%""#));
    }
}
