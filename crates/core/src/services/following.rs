//! Following service.

use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::following,
    repositories::{BlockingRepository, FollowingRepository, UserRepository},
};
use sea_orm::Set;

use crate::services::notification::NotificationService;

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    blocking_repo: BlockingRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub fn new(
        following_repo: FollowingRepository,
        blocking_repo: BlockingRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            following_repo,
            blocking_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self
            .following_repo
            .is_following(follower_id, followee_id)
            .await?
        {
            return Err(AppError::BadRequest("Already following".to_string()));
        }

        if self
            .blocking_repo
            .is_blocked_between(follower_id, followee_id)
            .await?
        {
            return Err(AppError::Forbidden("Cannot follow this user".to_string()));
        }

        let follower = self.user_repo.get_by_id(follower_id).await?;
        self.user_repo.get_by_id(followee_id).await?;

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            ..Default::default()
        };
        self.following_repo.create(model).await?;

        self.user_repo.increment_following_count(follower_id).await?;
        self.user_repo.increment_followers_count(followee_id).await?;

        let message = format!("{} started following you", follower.username);
        if let Err(e) = self
            .notification_service
            .notify_follow(followee_id, follower_id, &message)
            .await
        {
            tracing::warn!(error = %e, "Failed to create follow notification");
        }

        Ok(())
    }

    /// Unfollow a user.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot unfollow yourself".to_string()));
        }

        let existing = self
            .following_repo
            .find_by_pair(follower_id, followee_id)
            .await?;
        if existing.is_none() {
            return Err(AppError::BadRequest("Not following".to_string()));
        }

        self.following_repo
            .delete_by_pair(follower_id, followee_id)
            .await?;

        self.user_repo.decrement_following_count(follower_id).await?;
        self.user_repo.decrement_followers_count(followee_id).await?;

        Ok(())
    }

    /// Check whether `follower_id` follows `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.following_repo
            .is_following(follower_id, followee_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rhythme_db::entities::blocking;
    use rhythme_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_following(id: &str, follower_id: &str, followee_id: &str) -> following::Model {
        following::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn build_service(
        following_db: MockDatabase,
        blocking_db: MockDatabase,
    ) -> FollowingService {
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let notification_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        FollowingService::new(
            FollowingRepository::new(Arc::new(following_db.into_connection())),
            BlockingRepository::new(Arc::new(blocking_db.into_connection())),
            UserRepository::new(user_db),
            NotificationService::new(NotificationRepository::new(notification_db)),
        )
    }

    #[tokio::test]
    async fn test_follow_yourself_returns_error() {
        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.follow("user1", "user1").await;

        match result {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("yourself")),
            _ => panic!("Expected BadRequest error"),
        }
    }

    #[tokio::test]
    async fn test_follow_already_following_returns_error() {
        let following = create_test_following("f1", "user1", "user2");
        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[following]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.follow("user1", "user2").await;

        match result {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("Already following")),
            _ => panic!("Expected BadRequest error"),
        }
    }

    #[tokio::test]
    async fn test_follow_blocked_pair_is_forbidden() {
        let edge = blocking::Model {
            id: "b1".to_string(),
            blocker_id: "user2".to_string(),
            blockee_id: "user1".to_string(),
            created_at: Utc::now().into(),
        };

        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()]),
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[edge]]),
        );

        let result = service.follow("user1", "user2").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
