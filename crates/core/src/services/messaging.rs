//! Direct messaging service.

use chrono::Utc;
use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::{conversation, message, notification::NotificationType},
    repositories::{BlockingRepository, ConversationRepository, MessageRepository, UserRepository},
};
use sea_orm::Set;
use validator::Validate;

use crate::services::event_publisher::EventPublisherService;
use crate::services::notification::NotificationService;

/// Input for sending a message.
#[derive(Debug, Clone, Validate)]
pub struct SendMessageInput {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

/// Messaging service for business logic.
#[derive(Clone)]
pub struct MessagingService {
    conversation_repo: ConversationRepository,
    message_repo: MessageRepository,
    blocking_repo: BlockingRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl MessagingService {
    /// Create a new messaging service.
    #[must_use]
    pub fn new(
        conversation_repo: ConversationRepository,
        message_repo: MessageRepository,
        blocking_repo: BlockingRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            conversation_repo,
            message_repo,
            blocking_repo,
            user_repo,
            notification_service,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Get the conversation between two users, creating it if absent.
    ///
    /// Participants are stored in canonical (sorted) order, so repeated
    /// calls with either argument order return the same row.
    pub async fn get_or_create_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<conversation::Model> {
        if user_id == partner_id {
            return Err(AppError::BadRequest(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }

        if self
            .blocking_repo
            .is_blocked_between(user_id, partner_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Cannot message this user".to_string(),
            ));
        }

        self.user_repo.get_by_id(partner_id).await?;

        if let Some(existing) = self.conversation_repo.find_by_pair(user_id, partner_id).await? {
            return Ok(existing);
        }

        let (lo, hi) = conversation::canonical_pair(user_id, partner_id);
        let model = conversation::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_a_id: Set(lo.to_string()),
            user_b_id: Set(hi.to_string()),
            ..Default::default()
        };

        self.conversation_repo.create(model).await
    }

    /// Send a message within a conversation.
    pub async fn send_message(
        &self,
        sender_id: &str,
        conversation_id: &str,
        input: SendMessageInput,
    ) -> AppResult<message::Model> {
        input.validate()?;

        let conversation = self.conversation_repo.get_by_id(conversation_id).await?;
        if !conversation.has_participant(sender_id) {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }

        let recipient_id = conversation.partner_of(sender_id).to_string();

        if self
            .blocking_repo
            .is_blocked_between(sender_id, &recipient_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Cannot message this user".to_string(),
            ));
        }

        let now = Utc::now();
        let model = message::ActiveModel {
            id: Set(self.id_gen.generate()),
            conversation_id: Set(conversation_id.to_string()),
            sender_id: Set(sender_id.to_string()),
            text: Set(input.text.clone()),
            created_at: Set(now.into()),
        };
        let created = self.message_repo.create(model).await?;

        self.conversation_repo
            .update_last_message(conversation_id, &created.text, sender_id, now)
            .await?;

        let sender = self.user_repo.get_by_id(sender_id).await?;
        let notice = format!("New message from {}", sender.username);
        if let Err(e) = self
            .notification_service
            .notify(
                &recipient_id,
                Some(sender_id),
                NotificationType::Message,
                &notice,
                None,
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to create message notification");
        }

        if let Some(ref publisher) = self.event_publisher
            && let Err(e) = publisher
                .publish_direct_message(
                    &created.id,
                    conversation_id,
                    sender_id,
                    &recipient_id,
                    &created.text,
                )
                .await
        {
            tracing::warn!(error = %e, "Failed to publish direct message event");
        }

        Ok(created)
    }

    /// Conversations for a user, most recently active first.
    pub async fn list_conversations(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<conversation::Model>> {
        self.conversation_repo
            .find_for_user(user_id, limit, offset)
            .await
    }

    /// Message history within a conversation. Only participants may read.
    pub async fn list_messages(
        &self,
        user_id: &str,
        conversation_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        let conversation = self.conversation_repo.get_by_id(conversation_id).await?;
        if !conversation.has_participant(user_id) {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }

        self.message_repo
            .find_by_conversation(conversation_id, limit, until_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rhythme_db::entities::blocking;
    use rhythme_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_conversation(id: &str, user_a_id: &str, user_b_id: &str) -> conversation::Model {
        conversation::Model {
            id: id.to_string(),
            user_a_id: user_a_id.to_string(),
            user_b_id: user_b_id.to_string(),
            last_message_text: None,
            last_message_sender_id: None,
            last_message_at: None,
            created_at: Utc::now().into(),
        }
    }

    fn build_service(
        conversation_db: MockDatabase,
        blocking_db: MockDatabase,
        user_db: MockDatabase,
    ) -> MessagingService {
        let message_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let notification_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        MessagingService::new(
            ConversationRepository::new(Arc::new(conversation_db.into_connection())),
            MessageRepository::new(message_db),
            BlockingRepository::new(Arc::new(blocking_db.into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
            NotificationService::new(NotificationRepository::new(notification_db)),
        )
    }

    fn create_test_user(id: &str) -> rhythme_db::entities::user::Model {
        rhythme_db::entities::user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            token: Some("token".to_string()),
            name: None,
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
    async fn test_conversation_with_yourself_returns_error() {
        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.get_or_create_conversation("user1", "user1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing_for_reversed_pair() {
        let existing = create_test_conversation("c1", "user1", "user2");

        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blocking::Model>::new()]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("user1")]]),
        );

        let conversation = service
            .get_or_create_conversation("user2", "user1")
            .await
            .unwrap();

        assert_eq!(conversation.id, "c1");
        assert_eq!(conversation.user_a_id, "user1");
        assert_eq!(conversation.user_b_id, "user2");
    }

    #[tokio::test]
    async fn test_conversation_blocked_pair_is_forbidden() {
        let edge = blocking::Model {
            id: "b1".to_string(),
            blocker_id: "user2".to_string(),
            blockee_id: "user1".to_string(),
            created_at: Utc::now().into(),
        };

        let service = build_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[edge]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.get_or_create_conversation("user1", "user2").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
