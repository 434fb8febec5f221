//! Blocking service.

use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::{blocking, user},
    repositories::{BlockingRepository, FollowingRepository, UserRepository},
};
use sea_orm::Set;

/// Blocking service for business logic.
#[derive(Clone)]
pub struct BlockingService {
    blocking_repo: BlockingRepository,
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl BlockingService {
    /// Create a new blocking service.
    #[must_use]
    pub fn new(
        blocking_repo: BlockingRepository,
        following_repo: FollowingRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            blocking_repo,
            following_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Block a user. Severs follow relationships in both directions.
    pub async fn block(&self, blocker_id: &str, blockee_id: &str) -> AppResult<()> {
        if blocker_id == blockee_id {
            return Err(AppError::BadRequest("Cannot block yourself".to_string()));
        }

        if self.blocking_repo.is_blocking(blocker_id, blockee_id).await? {
            return Err(AppError::BadRequest("Already blocking".to_string()));
        }

        self.user_repo.get_by_id(blockee_id).await?;

        let model = blocking::ActiveModel {
            id: Set(self.id_gen.generate()),
            blocker_id: Set(blocker_id.to_string()),
            blockee_id: Set(blockee_id.to_string()),
            ..Default::default()
        };
        self.blocking_repo.create(model).await?;

        // Remove any follow relationship in either direction
        if self
            .following_repo
            .find_by_pair(blocker_id, blockee_id)
            .await?
            .is_some()
        {
            self.following_repo
                .delete_by_pair(blocker_id, blockee_id)
                .await?;
            self.user_repo.decrement_following_count(blocker_id).await?;
            self.user_repo.decrement_followers_count(blockee_id).await?;
        }

        if self
            .following_repo
            .find_by_pair(blockee_id, blocker_id)
            .await?
            .is_some()
        {
            self.following_repo
                .delete_by_pair(blockee_id, blocker_id)
                .await?;
            self.user_repo.decrement_following_count(blockee_id).await?;
            self.user_repo.decrement_followers_count(blocker_id).await?;
        }

        Ok(())
    }

    /// Unblock a user.
    pub async fn unblock(&self, blocker_id: &str, blockee_id: &str) -> AppResult<()> {
        let existing = self
            .blocking_repo
            .find_by_pair(blocker_id, blockee_id)
            .await?;
        if existing.is_none() {
            return Err(AppError::BadRequest("Not blocking".to_string()));
        }

        self.blocking_repo
            .delete_by_pair(blocker_id, blockee_id)
            .await
    }

    /// List users blocked by `blocker_id`.
    pub async fn list_blocked(&self, blocker_id: &str) -> AppResult<Vec<user::Model>> {
        let ids = self.blocking_repo.find_blockee_ids(blocker_id).await?;
        self.user_repo.find_by_ids(&ids).await
    }

    /// Check whether a block exists in either direction.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocked_between(user_a, user_b).await
    }
}
