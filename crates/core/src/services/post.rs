//! Post service.

use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::{
        notification::NotificationType,
        post::{self, SpotifyContent},
        post_comment, post_like,
    },
    repositories::{FollowingRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::event_publisher::EventPublisherService;
use crate::services::notification::NotificationService;
use crate::services::visibility::{ProfileSection, VisibilityService};

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
    pub image_url: Option<String>,
    pub spotify_content: Option<SpotifyContent>,
}

/// Input for editing a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(min = 1, max = 4096))]
    pub text: Option<String>,
    pub image_url: Option<String>,
}

/// Input for commenting on a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 2048))]
    pub text: String,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    visibility: VisibilityService,
    notification_service: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        following_repo: FollowingRepository,
        visibility: VisibilityService,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            following_repo,
            visibility,
            notification_service,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Create a post.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        input.validate()?;

        let spotify_json = input.spotify_content.as_ref().map(SpotifyContent::to_json);

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(author_id.to_string()),
            text: Set(input.text),
            image_url: Set(input.image_url),
            spotify_content: Set(spotify_json),
            ..Default::default()
        };

        let created = self.post_repo.create(model).await?;
        self.user_repo.increment_posts_count(author_id).await?;

        self.publish_post_event(&created.id, author_id, "created").await;

        Ok(created)
    }

    /// Get a post as seen by `viewer_id`, applying the author's posts privacy.
    pub async fn get_visible(&self, viewer_id: &str, post_id: &str) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let allowed = self
            .visibility
            .can_view(viewer_id, &post.user_id, ProfileSection::Posts)
            .await?;
        if !allowed {
            return Err(AppError::Forbidden("Post is not visible".to_string()));
        }

        Ok(post)
    }

    /// Edit a post's text or image. Only the author may edit.
    pub async fn update(
        &self,
        user_id: &str,
        post_id: &str,
        input: UpdatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;

        let post = self.post_repo.get_by_id(post_id).await?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author may edit this post".to_string(),
            ));
        }

        let mut active: post::ActiveModel = post.into();
        if let Some(text) = input.text {
            active.text = Set(text);
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.post_repo.update(active).await
    }

    /// Delete a post. Allowed for the author or an admin.
    pub async fn delete(&self, actor_id: &str, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.user_id != actor_id {
            let actor = self.user_repo.get_by_id(actor_id).await?;
            if !actor.is_admin {
                return Err(AppError::Forbidden(
                    "Only the author or an admin may delete this post".to_string(),
                ));
            }
        }

        let author_id = post.user_id.clone();
        self.post_repo.delete(post_id).await?;
        self.user_repo.decrement_posts_count(&author_id).await?;

        self.publish_post_event(post_id, &author_id, "deleted").await;

        Ok(())
    }

    /// Home feed: posts by followed users and the requester, newest first.
    pub async fn feed(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut author_ids = self.following_repo.find_followee_ids(user_id).await?;
        author_ids.push(user_id.to_string());

        self.post_repo
            .find_by_authors(&author_ids, limit, until_id)
            .await
    }

    /// Posts by a single author, gated by their posts privacy.
    pub async fn by_author(
        &self,
        viewer_id: &str,
        author_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let allowed = self
            .visibility
            .can_view(viewer_id, author_id, ProfileSection::Posts)
            .await?;
        if !allowed {
            return Err(AppError::Forbidden("Posts are not visible".to_string()));
        }

        self.post_repo
            .find_by_author(author_id, limit, until_id)
            .await
    }

    /// Toggle a like. Repeated calls alternate between liked and unliked,
    /// so a user can never hold more than one like on a post.
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> AppResult<LikeOutcome> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if let Some(_existing) = self.post_repo.find_like(post_id, user_id).await? {
            self.post_repo.delete_like(post_id, user_id).await?;
            self.post_repo.decrement_likes_count(post_id).await?;
            self.publish_post_event(post_id, user_id, "unliked").await;
            return Ok(LikeOutcome::Unliked);
        }

        let model = post_like::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            user_id: Set(user_id.to_string()),
            ..Default::default()
        };
        self.post_repo.create_like(model).await?;
        self.post_repo.increment_likes_count(post_id).await?;

        let liker = self.user_repo.get_by_id(user_id).await?;
        let message = format!("{} liked your post", liker.username);
        if let Err(e) = self
            .notification_service
            .notify(
                &post.user_id,
                Some(user_id),
                NotificationType::Like,
                &message,
                Some(post_id),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to create like notification");
        }

        self.publish_post_event(post_id, user_id, "liked").await;

        Ok(LikeOutcome::Liked)
    }

    /// Add a comment to a post.
    pub async fn comment(
        &self,
        user_id: &str,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<post_comment::Model> {
        input.validate()?;

        let post = self.post_repo.get_by_id(post_id).await?;

        let model = post_comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            user_id: Set(user_id.to_string()),
            text: Set(input.text),
            ..Default::default()
        };
        let created = self.post_repo.create_comment(model).await?;
        self.post_repo.increment_comments_count(post_id).await?;

        let commenter = self.user_repo.get_by_id(user_id).await?;
        let message = format!("{} commented on your post", commenter.username);
        if let Err(e) = self
            .notification_service
            .notify(
                &post.user_id,
                Some(user_id),
                NotificationType::Comment,
                &message,
                Some(post_id),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to create comment notification");
        }

        self.publish_post_event(post_id, user_id, "commented").await;

        Ok(created)
    }

    /// Comments on a post, oldest first.
    pub async fn comments(
        &self,
        post_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post_comment::Model>> {
        self.post_repo.get_by_id(post_id).await?;
        self.post_repo.find_comments(post_id, limit, offset).await
    }

    async fn publish_post_event(&self, post_id: &str, user_id: &str, kind: &str) {
        if let Some(ref publisher) = self.event_publisher
            && let Err(e) = publisher.publish_post_event(post_id, user_id, kind).await
        {
            tracing::warn!(error = %e, kind, "Failed to publish post event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::services::event_publisher::NoOpEventPublisher;
    use rhythme_db::repositories::{
        BlockingRepository, NotificationRepository, UserProfileRepository,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_post(id: &str, user_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            text: "hello".to_string(),
            image_url: None,
            spotify_content: None,
            likes_count: 1,
            comments_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn build_service(post_db: MockDatabase) -> PostService {
        let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let visibility = VisibilityService::new(
            UserProfileRepository::new(empty()),
            FollowingRepository::new(empty()),
            BlockingRepository::new(empty()),
        );

        PostService::new(
            PostRepository::new(Arc::new(post_db.into_connection())),
            UserRepository::new(empty()),
            FollowingRepository::new(empty()),
            visibility,
            NotificationService::new(NotificationRepository::new(empty())),
        )
    }

    #[tokio::test]
    async fn test_toggle_like_removes_existing_like() {
        let existing_like = post_like::Model {
            id: "l1".to_string(),
            post_id: "p1".to_string(),
            user_id: "user1".to_string(),
            created_at: Utc::now().into(),
        };

        let post_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1", "user2")]])
            .append_query_results([[existing_like]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ]);

        let mut service = build_service(post_db);
        service.set_event_publisher(Arc::new(NoOpEventPublisher));

        let outcome = service.toggle_like("user1", "p1").await.unwrap();

        assert_eq!(outcome, LikeOutcome::Unliked);
    }

    #[tokio::test]
    async fn test_update_by_non_author_is_forbidden() {
        let post_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1", "user2")]]);

        let service = build_service(post_db);

        let input = UpdatePostInput {
            text: Some("edited".to_string()),
            image_url: None,
        };
        let result = service.update("user1", "p1", input).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
