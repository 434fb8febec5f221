//! Spotify account linkage repository.

use std::sync::Arc;

use crate::entities::{SpotifyAccount, spotify_account};
use rhythme_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait};

/// Spotify account repository for database operations.
#[derive(Clone)]
pub struct SpotifyAccountRepository {
    db: Arc<DatabaseConnection>,
}

impl SpotifyAccountRepository {
    /// Create a new Spotify account repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a linkage by user ID.
    pub async fn find_by_user_id(
        &self,
        user_id: &str,
    ) -> AppResult<Option<spotify_account::Model>> {
        SpotifyAccount::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a linkage by user ID, returning an error if not found.
    pub async fn get_by_user_id(&self, user_id: &str) -> AppResult<spotify_account::Model> {
        self.find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no Spotify account linked for {user_id}")))
    }

    /// Create a linkage row.
    pub async fn create(
        &self,
        model: spotify_account::ActiveModel,
    ) -> AppResult<spotify_account::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a linkage row (token refresh).
    pub async fn update(
        &self,
        model: spotify_account::ActiveModel,
    ) -> AppResult<spotify_account::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Unlink a user's Spotify account.
    pub async fn delete(&self, user_id: &str) -> AppResult<()> {
        let account = self.get_by_user_id(user_id).await?;
        account
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
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
    async fn test_get_by_user_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<spotify_account::Model>::new()])
                .into_connection(),
        );

        let repo = SpotifyAccountRepository::new(db);
        let result = repo.get_by_user_id("user1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_user_id_found() {
        let account = spotify_account::Model {
            user_id: "user1".to_string(),
            spotify_user_id: "sp_user".to_string(),
            display_name: Some("DJ Test".to_string()),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now().into(),
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[account]])
                .into_connection(),
        );

        let repo = SpotifyAccountRepository::new(db);
        let result = repo.find_by_user_id("user1").await.unwrap();

        assert_eq!(result.unwrap().spotify_user_id, "sp_user");
    }
}
