//! Spotify account linkage entity (per-user OAuth tokens).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "spotify_account")]
pub struct Model {
    /// Same as user.id (1:1 relationship)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Linked Spotify user id
    pub spotify_user_id: String,

    /// Spotify display name
    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    /// OAuth access token
    #[sea_orm(column_type = "Text")]
    pub access_token: String,

    /// OAuth refresh token
    #[sea_orm(column_type = "Text")]
    pub refresh_token: String,

    /// Access-token expiry
    pub expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
