//! Spotify Web API integration.
//!
//! Two token flows: the client-credentials flow backs app-level search,
//! and the authorization-code flow links a user's Spotify account. User
//! tokens are stored per account and refreshed on expiry.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use rhythme_common::{AppError, AppResult, config::SpotifyConfig};
use rhythme_db::{entities::spotify_account, repositories::SpotifyAccountRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const API_BASE: &str = "https://api.spotify.com/v1";

/// A normalized Spotify item, the shape embedded into posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyItem {
    pub content_type: String,
    pub spotify_id: String,
    pub name: String,
    pub artist: Option<String>,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyProfile {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    images: Vec<ImageObject>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    #[serde(default)]
    images: Vec<ImageObject>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    #[serde(default)]
    album: Option<AlbumObject>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<Paging<TrackObject>>,
    #[serde(default)]
    artists: Option<Paging<ArtistObject>>,
    #[serde(default)]
    albums: Option<Paging<AlbumObject>>,
}

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    #[serde(default = "Vec::new")]
    artists: Vec<ArtistObject>,
}

#[derive(Debug, Default)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Spotify service for OAuth linking and catalog search.
#[derive(Clone)]
pub struct SpotifyService {
    config: Option<SpotifyConfig>,
    account_repo: SpotifyAccountRepository,
    http: reqwest::Client,
    app_token: Arc<RwLock<CachedToken>>,
}

impl SpotifyService {
    /// Create a new Spotify service.
    #[must_use]
    pub fn new(config: Option<SpotifyConfig>, account_repo: SpotifyAccountRepository) -> Self {
        Self {
            config,
            account_repo,
            http: reqwest::Client::new(),
            app_token: Arc::new(RwLock::new(CachedToken::default())),
        }
    }

    fn config(&self) -> AppResult<&SpotifyConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| AppError::Spotify("Spotify integration is not configured".to_string()))
    }

    /// Build the authorization URL the client redirects the user to.
    pub fn authorize_url(&self, state: &str) -> AppResult<String> {
        let config = self.config()?;

        let mut url = url::Url::parse(ACCOUNTS_BASE)
            .map_err(|e| AppError::Spotify(format!("bad accounts URL: {e}")))?;
        url.set_path("/authorize");
        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("scope", "user-read-email user-read-private")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Complete the authorization-code flow and link the account.
    pub async fn connect(&self, user_id: &str, code: &str) -> AppResult<spotify_account::Model> {
        let config = self.config()?;

        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &config.redirect_uri),
            ])
            .await?;

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            AppError::Spotify("token response missing refresh_token".to_string())
        })?;

        let profile: SpotifyProfile = self
            .get_json(&format!("{API_BASE}/me"), &token.access_token)
            .await?;

        let expires_at = Utc::now() + Duration::seconds(token.expires_in);

        let model = spotify_account::ActiveModel {
            user_id: Set(user_id.to_string()),
            spotify_user_id: Set(profile.id),
            display_name: Set(profile.display_name),
            access_token: Set(token.access_token),
            refresh_token: Set(refresh_token),
            expires_at: Set(expires_at.into()),
            ..Default::default()
        };

        // Re-linking replaces the previous linkage
        if self.account_repo.find_by_user_id(user_id).await?.is_some() {
            self.account_repo.delete(user_id).await?;
        }

        self.account_repo.create(model).await
    }

    /// Unlink a user's Spotify account.
    pub async fn disconnect(&self, user_id: &str) -> AppResult<()> {
        self.account_repo.delete(user_id).await
    }

    /// The linked account for a user, if any, with a fresh access token.
    pub async fn linked_account(&self, user_id: &str) -> AppResult<Option<spotify_account::Model>> {
        let Some(account) = self.account_repo.find_by_user_id(user_id).await? else {
            return Ok(None);
        };

        if account.expires_at > Utc::now() {
            return Ok(Some(account));
        }

        match self.refresh_user_token(account).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) => {
                // A dead refresh token means the linkage is stale; drop it
                // rather than erroring on every profile load.
                tracing::warn!(error = %e, user_id = %user_id, "Spotify token refresh failed, unlinking");
                self.account_repo.delete(user_id).await?;
                Ok(None)
            }
        }
    }

    /// Search the Spotify catalog.
    ///
    /// `kind` is one of "track", "artist", "album". Track and album
    /// results get genre tags from a batched artist lookup, since the
    /// search payload only carries genres on artist objects.
    pub async fn search(&self, query: &str, kind: &str, limit: u8) -> AppResult<Vec<SpotifyItem>> {
        if !matches!(kind, "track" | "artist" | "album") {
            return Err(AppError::BadRequest(format!("unknown search type: {kind}")));
        }

        let token = self.app_access_token().await?;

        let mut url = url::Url::parse(&format!("{API_BASE}/search"))
            .map_err(|e| AppError::Spotify(format!("bad search URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", kind)
            .append_pair("limit", &limit.clamp(1, 50).to_string());

        let response: SearchResponse = self.get_json(url.as_str(), &token).await?;

        let items = match kind {
            "artist" => response
                .artists
                .map(|p| p.items.into_iter().map(artist_to_item).collect())
                .unwrap_or_default(),
            "album" => {
                let albums = response.albums.map(|p| p.items).unwrap_or_default();
                let genres = self
                    .genres_for_artists(albums.iter().filter_map(|a| {
                        a.artists.first().map(|artist| artist.id.clone())
                    }))
                    .await?;
                albums
                    .into_iter()
                    .map(|a| album_to_item(a, &genres))
                    .collect()
            }
            _ => {
                let tracks = response.tracks.map(|p| p.items).unwrap_or_default();
                let genres = self
                    .genres_for_artists(tracks.iter().filter_map(|t| {
                        t.artists.first().map(|artist| artist.id.clone())
                    }))
                    .await?;
                tracks
                    .into_iter()
                    .map(|t| track_to_item(t, &genres))
                    .collect()
            }
        };

        Ok(items)
    }

    async fn genres_for_artists(
        &self,
        ids: impl Iterator<Item = String>,
    ) -> AppResult<std::collections::HashMap<String, Vec<String>>> {
        let unique: Vec<String> = {
            let mut seen = std::collections::HashSet::new();
            ids.filter(|id| seen.insert(id.clone())).collect()
        };

        if unique.is_empty() {
            return Ok(std::collections::HashMap::new());
        }

        let token = self.app_access_token().await?;
        let url = format!("{API_BASE}/artists?ids={}", unique.join(","));
        let response: ArtistsResponse = self.get_json(&url, &token).await?;

        Ok(response
            .artists
            .into_iter()
            .map(|a| (a.id, a.genres))
            .collect())
    }

    async fn app_access_token(&self) -> AppResult<String> {
        {
            let cached = self.app_token.read().await;
            if let Some(expires_at) = cached.expires_at
                && expires_at > Utc::now() + Duration::seconds(30)
            {
                return Ok(cached.access_token.clone());
            }
        }

        let token = self
            .request_token(&[("grant_type", "client_credentials")])
            .await?;

        let mut cached = self.app_token.write().await;
        cached.access_token = token.access_token.clone();
        cached.expires_at = Some(Utc::now() + Duration::seconds(token.expires_in));

        Ok(token.access_token)
    }

    async fn refresh_user_token(
        &self,
        account: spotify_account::Model,
    ) -> AppResult<spotify_account::Model> {
        let refresh_token = account.refresh_token.clone();
        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
            ])
            .await?;

        let expires_at = Utc::now() + Duration::seconds(token.expires_in);

        let mut active: spotify_account::ActiveModel = account.into();
        active.access_token = Set(token.access_token);
        if let Some(new_refresh) = token.refresh_token {
            active.refresh_token = Set(new_refresh);
        }
        active.expires_at = Set(expires_at.into());
        active.updated_at = Set(Some(Utc::now().into()));

        self.account_repo.update(active).await
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> AppResult<TokenResponse> {
        let config = self.config()?;
        let basic = BASE64.encode(format!("{}:{}", config.client_id, config.client_secret));

        let response = self
            .http
            .post(format!("{ACCOUNTS_BASE}/api/token"))
            .header("Authorization", format!("Basic {basic}"))
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Spotify(format!(
                "token request returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Spotify(format!("invalid token response: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> AppResult<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Spotify(format!(
                "Spotify API returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Spotify(format!("invalid response body: {e}")))
    }
}

fn artist_to_item(artist: ArtistObject) -> SpotifyItem {
    SpotifyItem {
        content_type: "artist".to_string(),
        spotify_id: artist.id,
        name: artist.name.clone(),
        artist: Some(artist.name),
        image_url: artist.images.first().map(|i| i.url.clone()),
        external_url: artist.external_urls.and_then(|u| u.spotify),
        genres: artist.genres,
    }
}

fn album_to_item(
    album: AlbumObject,
    genres: &std::collections::HashMap<String, Vec<String>>,
) -> SpotifyItem {
    let primary_artist = album.artists.first();
    let genre_tags = primary_artist
        .and_then(|a| genres.get(&a.id))
        .cloned()
        .unwrap_or_default();

    SpotifyItem {
        content_type: "album".to_string(),
        spotify_id: album.id,
        name: album.name,
        artist: primary_artist.map(|a| a.name.clone()),
        image_url: album.images.first().map(|i| i.url.clone()),
        external_url: album.external_urls.and_then(|u| u.spotify),
        genres: genre_tags,
    }
}

fn track_to_item(
    track: TrackObject,
    genres: &std::collections::HashMap<String, Vec<String>>,
) -> SpotifyItem {
    let primary_artist = track.artists.first();
    let genre_tags = primary_artist
        .and_then(|a| genres.get(&a.id))
        .cloned()
        .unwrap_or_default();

    SpotifyItem {
        content_type: "track".to_string(),
        spotify_id: track.id,
        name: track.name,
        artist: primary_artist.map(|a| a.name.clone()),
        image_url: track
            .album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|i| i.url.clone()),
        external_url: track.external_urls.and_then(|u| u.spotify),
        genres: genre_tags,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let body = serde_json::json!({
            "tracks": {
                "items": [{
                    "id": "t1",
                    "name": "Song",
                    "artists": [{"id": "a1", "name": "Band", "genres": []}],
                    "album": {"id": "al1", "name": "Album", "artists": [],
                              "images": [{"url": "https://img"}]},
                    "external_urls": {"spotify": "https://open.spotify.com/track/t1"}
                }]
            }
        });

        let parsed: SearchResponse = serde_json::from_value(body).unwrap();
        let tracks = parsed.tracks.unwrap().items;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists[0].name, "Band");
    }

    #[test]
    fn test_track_to_item_pulls_artist_genres() {
        let track = TrackObject {
            id: "t1".to_string(),
            name: "Song".to_string(),
            artists: vec![ArtistObject {
                id: "a1".to_string(),
                name: "Band".to_string(),
                genres: vec![],
                images: vec![],
                external_urls: None,
            }],
            album: None,
            external_urls: None,
        };

        let mut genres = std::collections::HashMap::new();
        genres.insert("a1".to_string(), vec!["shoegaze".to_string()]);

        let item = track_to_item(track, &genres);
        assert_eq!(item.content_type, "track");
        assert_eq!(item.genres, vec!["shoegaze".to_string()]);
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = SpotifyItem {
            content_type: "track".to_string(),
            spotify_id: "t1".to_string(),
            name: "Song".to_string(),
            artist: None,
            image_url: None,
            external_url: None,
            genres: vec![],
        };

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("contentType").is_some());
        assert!(json.get("spotifyId").is_some());
    }
}
