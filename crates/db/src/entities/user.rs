//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub username_lower: String,

    /// Access token for API authentication
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    /// Display name
    #[sea_orm(nullable)]
    pub name: Option<String>,

    /// Profile bio
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    /// Avatar URL or data URL
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,

    /// Google account linkage (external login), NULL for local-only accounts
    #[sea_orm(unique, nullable)]
    pub google_id: Option<String>,

    /// Followers count (denormalized)
    #[sea_orm(default_value = 0)]
    pub followers_count: i32,

    /// Following count (denormalized)
    #[sea_orm(default_value = 0)]
    pub following_count: i32,

    /// Posts count (denormalized)
    #[sea_orm(default_value = 0)]
    pub posts_count: i32,

    /// Is this user an admin?
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    /// Has this account been deactivated by its owner?
    #[sea_orm(default_value = false)]
    pub is_deactivated: bool,

    /// Soft-deletion timestamp; NULL for live accounts
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_one = "super::user_profile::Entity")]
    Profile,

    #[sea_orm(has_one = "super::spotify_account::Entity")]
    SpotifyAccount,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::spotify_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpotifyAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
