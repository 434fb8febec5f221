//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Normalized Spotify content descriptor attached to a post.
///
/// Stored as JSONB in the `spotify_content` column. A subset of the
/// Spotify API object: enough to render an embed and to feed the
/// recommendation scorer (genres, artist, exact item id).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyContent {
    /// Content type: "track", "album" or "artist".
    pub content_type: String,
    /// Spotify item ID.
    pub spotify_id: String,
    /// Display name of the item.
    pub name: String,
    /// Primary artist name.
    #[serde(default)]
    pub artist: Option<String>,
    /// Cover/artist image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Link to the item on Spotify.
    #[serde(default)]
    pub external_url: Option<String>,
    /// Genre tags (artist genres; lowercased at write time is not assumed).
    #[serde(default)]
    pub genres: Vec<String>,
}

impl SpotifyContent {
    /// Parse a descriptor out of a JSONB column value.
    #[must_use]
    pub fn from_json(value: &Json) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Serialize the descriptor for storage.
    #[must_use]
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Post text content
    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Optional image (data URL or link)
    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,

    /// Optional embedded Spotify content descriptor
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub spotify_content: Option<Json>,

    /// Like count (denormalized)
    #[sea_orm(default_value = 0)]
    pub likes_count: i32,

    /// Comment count (denormalized)
    #[sea_orm(default_value = 0)]
    pub comments_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Typed view of the attached Spotify content, if any.
    #[must_use]
    pub fn spotify(&self) -> Option<SpotifyContent> {
        self.spotify_content.as_ref().and_then(SpotifyContent::from_json)
    }
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

    #[sea_orm(has_many = "super::post_like::Entity")]
    Likes,

    #[sea_orm(has_many = "super::post_comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::post_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::post_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_spotify_content_roundtrip() {
        let content = SpotifyContent {
            content_type: "track".to_string(),
            spotify_id: "3n3Ppam7vgaVa1iaRUc9Lp".to_string(),
            name: "Mr. Brightside".to_string(),
            artist: Some("The Killers".to_string()),
            image_url: None,
            external_url: Some("https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp".to_string()),
            genres: vec!["alternative rock".to_string()],
        };

        let json = content.to_json();
        let parsed = SpotifyContent::from_json(&json).unwrap();
        assert_eq!(parsed, content);
    }

    #[test]
    fn test_spotify_content_tolerates_missing_optionals() {
        let json = serde_json::json!({
            "contentType": "artist",
            "spotifyId": "abc",
            "name": "Some Artist",
        });
        let parsed = SpotifyContent::from_json(&json).unwrap();
        assert!(parsed.artist.is_none());
        assert!(parsed.genres.is_empty());
    }
}
