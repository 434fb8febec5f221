//! User service.

use rhythme_common::{AppError, AppResult};
use rhythme_db::{
    entities::{user, user_profile, user_profile::PrivacySetting},
    repositories::{FollowingRepository, UserProfileRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::visibility::{ProfileSection, VisibilityService};

/// Input for updating profile fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 256))]
    pub name: Option<String>,
    #[validate(length(max = 2048))]
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Input for updating per-section privacy settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrivacyInput {
    pub profile_privacy: Option<PrivacySetting>,
    pub posts_privacy: Option<PrivacySetting>,
    pub friends_privacy: Option<PrivacySetting>,
}

/// User service for profile reads and edits.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    following_repo: FollowingRepository,
    visibility: VisibilityService,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        following_repo: FollowingRepository,
        visibility: VisibilityService,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            following_repo,
            visibility,
        }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.is_deactivated || user.deleted_at.is_some() {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Get a user's profile as seen by `viewer_id`, applying the privacy gate.
    pub async fn get_visible(&self, viewer_id: &str, owner_id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(owner_id).await?;

        let allowed = self
            .visibility
            .can_view(viewer_id, owner_id, ProfileSection::Profile)
            .await?;
        if !allowed {
            return Err(AppError::Forbidden("Profile is not visible".to_string()));
        }

        Ok(user)
    }

    /// Users followed by `owner_id`, gated by the friends-section privacy.
    pub async fn get_following(
        &self,
        viewer_id: &str,
        owner_id: &str,
    ) -> AppResult<Vec<user::Model>> {
        let allowed = self
            .visibility
            .can_view(viewer_id, owner_id, ProfileSection::Friends)
            .await?;
        if !allowed {
            return Err(AppError::Forbidden(
                "Friends list is not visible".to_string(),
            ));
        }

        let ids = self.following_repo.find_followee_ids(owner_id).await?;
        self.user_repo.find_by_ids(&ids).await
    }

    /// Followers of `owner_id`, gated by the friends-section privacy.
    pub async fn get_followers(
        &self,
        viewer_id: &str,
        owner_id: &str,
    ) -> AppResult<Vec<user::Model>> {
        let allowed = self
            .visibility
            .can_view(viewer_id, owner_id, ProfileSection::Friends)
            .await?;
        if !allowed {
            return Err(AppError::Forbidden(
                "Friends list is not visible".to_string(),
            ));
        }

        let ids = self.following_repo.find_follower_ids(owner_id).await?;
        self.user_repo.find_by_ids(&ids).await
    }

    /// Update profile fields.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(Some(name));
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Update per-section privacy settings, creating the profile row if
    /// one does not exist yet.
    pub async fn update_privacy(
        &self,
        user_id: &str,
        input: UpdatePrivacyInput,
    ) -> AppResult<user_profile::Model> {
        let existing = self.profile_repo.find_by_user_id(user_id).await?;

        match existing {
            Some(profile) => {
                let mut active: user_profile::ActiveModel = profile.into();
                if let Some(v) = input.profile_privacy {
                    active.profile_privacy = Set(v);
                }
                if let Some(v) = input.posts_privacy {
                    active.posts_privacy = Set(v);
                }
                if let Some(v) = input.friends_privacy {
                    active.friends_privacy = Set(v);
                }
                active.updated_at = Set(Some(chrono::Utc::now().into()));
                self.profile_repo.update(active).await
            }
            None => {
                let model = user_profile::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    profile_privacy: Set(input.profile_privacy.unwrap_or_default()),
                    posts_privacy: Set(input.posts_privacy.unwrap_or_default()),
                    friends_privacy: Set(input.friends_privacy.unwrap_or_default()),
                    ..Default::default()
                };
                self.profile_repo.create(model).await
            }
        }
    }

    /// Search users by username or display name.
    pub async fn search(&self, query: &str, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        self.user_repo.search(query.trim(), limit, offset).await
    }
}
