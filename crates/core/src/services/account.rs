//! Account service: registration, login, and password recovery.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::{user, user_profile},
    repositories::{UserProfileRepository, UserRepository},
};
use sea_orm::Set;
use validator::Validate;

use crate::services::email::EmailService;

/// Reset tokens stay valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Registration input.
#[derive(Debug, Clone, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[validate(length(max = 256))]
    pub name: Option<String>,
}

/// Login input.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Password reset input.
#[derive(Debug, Clone, Validate)]
pub struct ResetPasswordInput {
    pub token: String,
    #[validate(length(min = 8, max = 256))]
    pub new_password: String,
}

/// Password change input.
#[derive(Debug, Clone, Validate)]
pub struct ChangePasswordInput {
    pub current_password: String,
    #[validate(length(min = 8, max = 256))]
    pub new_password: String,
}

/// Account service for authentication flows.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    email_service: EmailService,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        email_service: EmailService,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            email_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account, returning the created user with its token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if !is_valid_username(&input.username) {
            return Err(AppError::BadRequest(
                "Username may only contain letters, digits, and underscores".to_string(),
            ));
        }

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        if self.profile_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user_id = self.id_gen.generate();
        let token = self.id_gen.generate_token();

        let user_model = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            token: Set(Some(token)),
            name: Set(input.name),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let created = self.user_repo.create(user_model).await?;

        let profile_model = user_profile::ActiveModel {
            user_id: Set(user_id.clone()),
            password: Set(Some(hash_password(&input.password)?)),
            email: Set(Some(input.email)),
            ..Default::default()
        };

        self.profile_repo.create(profile_model).await?;

        tracing::info!(user_id = %user_id, username = %created.username, "registered new account");

        Ok(created)
    }

    /// Verify credentials, returning the user on success.
    pub async fn login(&self, input: LoginInput) -> AppResult<user::Model> {
        let user = self.verify_credentials(&input.username, &input.password).await?;

        if user.is_deactivated {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Check a username/password pair without the deactivation gate.
    ///
    /// Deactivated accounts hold no token, so reactivation has to
    /// re-prove the password instead.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.deleted_at.is_some() {
            return Err(AppError::Unauthorized);
        }

        let profile = self
            .profile_repo
            .find_by_user_id(&user.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_hash = profile.password.ok_or(AppError::Unauthorized)?;
        if !verify_password(password, &password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Regenerate a user's authentication token, invalidating the old one.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;

        Ok(token)
    }

    /// Begin a password reset: store a token and email it to the account.
    ///
    /// Silently succeeds when the email is unknown, so the endpoint does
    /// not leak which addresses have accounts.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(profile) = self.profile_repo.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = self.id_gen.generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let user_id = profile.user_id.clone();
        let mut active: user_profile::ActiveModel = profile.into();
        active.reset_token = Set(Some(token.clone()));
        active.reset_token_expires_at = Set(Some(expires_at.into()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.profile_repo.update(active).await?;

        let user = self.user_repo.get_by_id(&user_id).await?;
        self.email_service
            .send_password_reset(email, &user.username, &token)
            .await?;

        Ok(())
    }

    /// Complete a password reset using the emailed token.
    pub async fn reset_password(&self, input: ResetPasswordInput) -> AppResult<()> {
        input.validate()?;

        let profile = self
            .profile_repo
            .find_by_reset_token(&input.token)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

        let expired = profile
            .reset_token_expires_at
            .is_none_or(|t| t < Utc::now());
        if expired {
            return Err(AppError::BadRequest(
                "Invalid or expired reset token".to_string(),
            ));
        }

        let mut active: user_profile::ActiveModel = profile.into();
        active.password = Set(Some(hash_password(&input.new_password)?));
        active.reset_token = Set(None);
        active.reset_token_expires_at = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));
        self.profile_repo.update(active).await?;

        Ok(())
    }

    /// Change the password, verifying the current one first.
    pub async fn change_password(
        &self,
        user_id: &str,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        input.validate()?;

        let profile = self
            .profile_repo
            .find_by_user_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_hash = profile.password.clone().ok_or(AppError::Unauthorized)?;
        if !verify_password(&input.current_password, &password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let mut active: user_profile::ActiveModel = profile.into();
        active.password = Set(Some(hash_password(&input.new_password)?));
        active.updated_at = Set(Some(Utc::now().into()));
        self.profile_repo.update(active).await?;

        Ok(())
    }

    /// Deactivate an account. The user disappears from login and search but
    /// rows are retained.
    pub async fn deactivate(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        active.is_deactivated = Set(true);
        active.token = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;

        Ok(())
    }

    /// Reactivate a previously deactivated account and issue a fresh token.
    pub async fn reactivate(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;

        if user.deleted_at.is_some() {
            return Err(AppError::BadRequest("Account was deleted".to_string()));
        }

        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.is_deactivated = Set(false);
        active.token = Set(Some(token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;

        Ok(token)
    }

    /// Soft-delete an account: mark deleted, drop the token and credentials.
    pub async fn delete(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        active.is_deactivated = Set(true);
        active.token = Set(None);
        active.deleted_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;

        if let Some(profile) = self.profile_repo.find_by_user_id(user_id).await? {
            let mut active: user_profile::ActiveModel = profile.into();
            active.password = Set(None);
            active.reset_token = Set(None);
            active.reset_token_expires_at = Set(None);
            self.profile_repo.update(active).await?;
        }

        tracing::info!(user_id = %user_id, "account soft-deleted");

        Ok(())
    }

    /// Hard-delete an account and all of its rows. Admin only; foreign
    /// keys cascade the user's posts, edges, and messages.
    pub async fn hard_delete(&self, actor_id: &str, target_user_id: &str) -> AppResult<()> {
        let actor = self.user_repo.get_by_id(actor_id).await?;
        if !actor.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        self.user_repo.get_by_id(target_user_id).await?;
        self.user_repo.delete(target_user_id).await?;

        tracing::info!(user_id = %target_user_id, actor_id = %actor_id, "account hard-deleted");

        Ok(())
    }
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_wrong() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(!verify_password("something_else", &hash).unwrap());
    }

    #[test]
    fn test_username_charset() {
        assert!(is_valid_username("music_fan42"));
        assert!(!is_valid_username("has spaces"));
        assert!(!is_valid_username("dash-ed"));
    }

    #[test]
    fn test_register_input_rejects_short_password() {
        let input = RegisterInput {
            username: "music_fan42".to_string(),
            email: "a@example.com".to_string(),
            password: "short".to_string(),
            name: None,
        };
        assert!(input.validate().is_err());
    }
}
