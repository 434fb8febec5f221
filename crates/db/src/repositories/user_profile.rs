//! User profile repository.

use std::sync::Arc;

use crate::entities::{UserProfile, user_profile};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
};

/// User profile repository for database operations.
#[derive(Clone)]
pub struct UserProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl UserProfileRepository {
    /// Create a new user profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by user ID.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<user_profile::Model>> {
        UserProfile::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a profile by user ID, returning an error if not found.
    pub async fn get_by_user_id(&self, user_id: &str) -> AppResult<user_profile::Model> {
        self.find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Find a profile by email address.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user_profile::Model>> {
        UserProfile::find()
            .filter(user_profile::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a profile by pending password-reset token.
    pub async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<user_profile::Model>> {
        UserProfile::find()
            .filter(user_profile::Column::ResetToken.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new profile.
    pub async fn create(&self, model: user_profile::ActiveModel) -> AppResult<user_profile::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a profile.
    pub async fn update(&self, model: user_profile::ActiveModel) -> AppResult<user_profile::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a profile.
    pub async fn delete(&self, user_id: &str) -> AppResult<()> {
        let profile = self.get_by_user_id(user_id).await?;
        profile
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
    use crate::entities::user_profile::PrivacySetting;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_profile(user_id: &str) -> user_profile::Model {
        user_profile::Model {
            user_id: user_id.to_string(),
            password: Some("$argon2id$hash".to_string()),
            email: Some("test@example.com".to_string()),
            profile_privacy: PrivacySetting::Public,
            posts_privacy: PrivacySetting::Public,
            friends_privacy: PrivacySetting::Public,
            reset_token: None,
            reset_token_expires_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let profile = create_test_profile("user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[profile]])
                .into_connection(),
        );

        let repo = UserProfileRepository::new(db);
        let result = repo.find_by_email("test@example.com").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().user_id, "user1");
    }

    #[tokio::test]
    async fn test_get_by_user_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user_profile::Model>::new()])
                .into_connection(),
        );

        let repo = UserProfileRepository::new(db);
        let result = repo.get_by_user_id("missing").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }
}
