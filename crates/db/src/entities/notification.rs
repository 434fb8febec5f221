//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "message")]
    Message,
    #[sea_orm(string_value = "report")]
    Report,
}

impl NotificationType {
    /// Wire name of the notification type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
            Self::Message => "message",
            Self::Report => "report",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub notifiee_id: String,

    /// The user who triggered the notification (optional for system events)
    #[sea_orm(nullable)]
    pub notifier_id: Option<String>,

    /// Notification type
    pub notification_type: NotificationType,

    /// Human-readable message
    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Related post ID (for like/comment notifications)
    #[sea_orm(nullable)]
    pub post_id: Option<String>,

    /// Has this notification been read?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::NotifieeId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Notifiee,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::NotifierId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Notifier,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl ActiveModelBehavior for ActiveModel {}
