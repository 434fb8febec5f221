//! Direct message repository.

use std::sync::Arc;

use crate::entities::{Message, message};
use rhythme_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Message repository for database operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a message row.
    pub async fn create(&self, model: message::ActiveModel) -> AppResult<message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages in a conversation, newest first, optionally before a given id.
    pub async fn find_by_conversation(
        &self,
        conversation_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        let mut condition =
            Condition::all().add(message::Column::ConversationId.eq(conversation_id));

        if let Some(until) = until_id {
            condition = condition.add(message::Column::Id.lt(until));
        }

        Message::find()
            .filter(condition)
            .order_by_desc(message::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_message() {
        let msg = message::Model {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "user1".to_string(),
            text: "hey".to_string(),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[msg.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);

        let active = message::ActiveModel {
            id: Set("m1".to_string()),
            conversation_id: Set("c1".to_string()),
            sender_id: Set("user1".to_string()),
            text: Set("hey".to_string()),
            created_at: Set(Utc::now().into()),
        };

        let result = repo.create(active).await.unwrap();
        assert_eq!(result.conversation_id, "c1");
    }

    #[tokio::test]
    async fn test_find_by_conversation_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<message::Model>::new()])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);
        let result = repo.find_by_conversation("c1", 30, None).await.unwrap();

        assert!(result.is_empty());
    }
}
