//! Conversation repository.

use std::sync::Arc;

use crate::entities::{Conversation, conversation};
use chrono::{DateTime, Utc};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Conversation repository for database operations.
#[derive(Clone)]
pub struct ConversationRepository {
    db: Arc<DatabaseConnection>,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a conversation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<conversation::Model>> {
        Conversation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a conversation by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<conversation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))
    }

    /// Find the conversation between two users, regardless of argument order.
    pub async fn find_by_pair(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<conversation::Model>> {
        let (lo, hi) = conversation::canonical_pair(user_a, user_b);

        Conversation::find()
            .filter(conversation::Column::UserAId.eq(lo))
            .filter(conversation::Column::UserBId.eq(hi))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a conversation row. Participants must already be in canonical
    /// order (the service builds the active model via `canonical_pair`).
    pub async fn create(&self, model: conversation::ActiveModel) -> AppResult<conversation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Conversations involving a user, most recently active first.
    pub async fn find_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<conversation::Model>> {
        let condition = Condition::any()
            .add(conversation::Column::UserAId.eq(user_id))
            .add(conversation::Column::UserBId.eq(user_id));

        Conversation::find()
            .filter(condition)
            .order_by_desc(conversation::Column::LastMessageAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Refresh the denormalized last-message snapshot on a conversation.
    pub async fn update_last_message(
        &self,
        conversation_id: &str,
        text: &str,
        sender_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let model = conversation::ActiveModel {
            id: Set(conversation_id.to_string()),
            last_message_text: Set(Some(text.to_string())),
            last_message_sender_id: Set(Some(sender_id.to_string())),
            last_message_at: Set(Some(at.into())),
            ..Default::default()
        };

        model
            .update(self.db.as_ref())
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

    fn create_test_conversation(id: &str, a: &str, b: &str) -> conversation::Model {
        conversation::Model {
            id: id.to_string(),
            user_a_id: a.to_string(),
            user_b_id: b.to_string(),
            last_message_text: None,
            last_message_sender_id: None,
            last_message_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_order_independent() {
        let conv = create_test_conversation("c1", "alice_id", "bob_id");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[conv.clone()], [conv]])
                .into_connection(),
        );

        let repo = ConversationRepository::new(db);

        let forward = repo.find_by_pair("alice_id", "bob_id").await.unwrap();
        let reversed = repo.find_by_pair("bob_id", "alice_id").await.unwrap();

        assert_eq!(forward.unwrap().id, "c1");
        assert_eq!(reversed.unwrap().id, "c1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<conversation::Model>::new()])
                .into_connection(),
        );

        let repo = ConversationRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::ConversationNotFound(_))));
    }
}
