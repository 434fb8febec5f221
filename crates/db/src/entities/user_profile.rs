//! User profile entity (stores password, email and privacy settings).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-section privacy setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PrivacySetting {
    /// Visible to anyone.
    #[sea_orm(string_value = "public")]
    #[default]
    Public,
    /// Visible only to the owner's followers.
    #[sea_orm(string_value = "followers")]
    Followers,
    /// Visible only to the owner.
    #[sea_orm(string_value = "private")]
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profile")]
pub struct Model {
    /// Same as user.id (1:1 relationship)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Password hash (Argon2, NULL for Google-only accounts)
    #[sea_orm(nullable)]
    pub password: Option<String>,

    /// Email address
    #[sea_orm(nullable)]
    pub email: Option<String>,

    /// Who may view the profile page
    pub profile_privacy: PrivacySetting,

    /// Who may view the user's posts
    pub posts_privacy: PrivacySetting,

    /// Who may view the followers/following lists
    pub friends_privacy: PrivacySetting,

    /// Pending password-reset token
    #[sea_orm(nullable)]
    pub reset_token: Option<String>,

    /// Expiry of the pending password-reset token
    #[sea_orm(nullable)]
    pub reset_token_expires_at: Option<DateTimeWithTimeZone>,

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
