//! Conversation entity.
//!
//! A conversation always has exactly two distinct participants, stored in
//! canonical order (`user_a_id < user_b_id`). The unique pair index makes
//! get-or-create idempotent for any (A, B) pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Lexicographically smaller participant id
    pub user_a_id: String,

    /// Lexicographically larger participant id
    pub user_b_id: String,

    /// Snapshot of the most recent message text (denormalized)
    #[sea_orm(column_type = "Text", nullable)]
    pub last_message_text: Option<String>,

    /// Sender of the most recent message
    #[sea_orm(nullable)]
    pub last_message_sender_id: Option<String>,

    /// When the most recent message was sent
    #[sea_orm(nullable)]
    pub last_message_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// The other participant from `user_id`'s point of view.
    #[must_use]
    pub fn partner_of(&self, user_id: &str) -> &str {
        if self.user_a_id == user_id {
            &self.user_b_id
        } else {
            &self.user_a_id
        }
    }

    /// Whether `user_id` participates in this conversation.
    #[must_use]
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }
}

/// Order a participant pair canonically.
#[must_use]
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message::Entity")]
    Messages,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pair_is_order_independent() {
        assert_eq!(canonical_pair("u1", "u2"), ("u1", "u2"));
        assert_eq!(canonical_pair("u2", "u1"), ("u1", "u2"));
    }
}
