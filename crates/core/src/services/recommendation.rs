//! Post and friend recommendations.
//!
//! Post ranking is a weighted sum over social proximity (followed /
//! friend-of-a-friend authors), popularity, and musical taste derived
//! from the Spotify content on the requester's own posts. Friend
//! suggestions count friend-of-a-friend occurrences.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use rhythme_common::AppResult;
use rhythme_db::{
    entities::{post, user},
    repositories::{FollowingRepository, PostRepository, UserRepository},
};

/// Candidate posts must be at most this old.
const CANDIDATE_WINDOW_DAYS: i64 = 30;

/// Default number of recommendations returned.
const DEFAULT_LIMIT: u64 = 5;

/// Candidates fetched per requested result, to allow re-ranking.
const FETCH_MULTIPLIER: u64 = 5;

/// Cap on the requester's own posts scanned for taste signals.
const TASTE_SCAN_LIMIT: u64 = 200;

/// Score weights.
const WEIGHT_FOLLOWED_AUTHOR: f64 = 5.0;
const WEIGHT_FOAF_AUTHOR: f64 = 3.0;
const WEIGHT_PER_LIKE: f64 = 0.5;
const LIKE_CAP: i32 = 10;
const WEIGHT_ARTIST_MATCH: f64 = 4.0;
const WEIGHT_EXACT_ITEM_MATCH: f64 = 6.0;
const WEIGHT_TRACK_TYPE: f64 = 1.0;

/// A recommended post with its computed score.
#[derive(Debug, Clone)]
pub struct ScoredPost {
    pub post: post::Model,
    pub score: f64,
}

/// A suggested user to follow.
#[derive(Debug, Clone)]
pub struct FriendSuggestion {
    pub user: user::Model,
    /// How many of the requester's follows also follow this user.
    pub mutual_count: usize,
}

/// Taste signals extracted from a set of posts' Spotify content.
#[derive(Debug, Default)]
struct TasteProfile {
    genres: HashSet<String>,
    artists: HashSet<String>,
    spotify_ids: HashSet<String>,
}

/// Recommendation service.
#[derive(Clone)]
pub struct RecommendationService {
    post_repo: PostRepository,
    following_repo: FollowingRepository,
    user_repo: UserRepository,
}

impl RecommendationService {
    /// Create a new recommendation service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        following_repo: FollowingRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            post_repo,
            following_repo,
            user_repo,
        }
    }

    /// Recommend posts for a user.
    ///
    /// Candidates exclude the requester's own posts and posts by authors
    /// they already follow, and are restricted to the last 30 days. An
    /// unknown user yields an empty list rather than an error.
    pub async fn recommend_posts(
        &self,
        user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<ScoredPost>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).max(1);

        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Ok(vec![]);
        }

        let following = self.following_repo.find_followee_ids(user_id).await?;
        let following_set: HashSet<&str> = following.iter().map(String::as_str).collect();

        // Taste from the requester's own posts; genre fallback comes from
        // followed users' posts when the requester has no tagged posts.
        let own_posts = self
            .post_repo
            .find_by_author(user_id, TASTE_SCAN_LIMIT, None)
            .await?;
        let mut taste = extract_taste(&own_posts);

        if taste.genres.is_empty() && !following.is_empty() {
            let followed_posts = self
                .post_repo
                .find_by_authors(&following, TASTE_SCAN_LIMIT, None)
                .await?;
            taste.genres = extract_taste(&followed_posts).genres;
        }

        // Friend-of-a-friend author set: anyone followed by someone the
        // requester follows.
        let edges = self.following_repo.find_edges_from(&following).await?;
        let foaf: HashSet<String> = edges
            .into_iter()
            .map(|e| e.followee_id)
            .filter(|id| id != user_id && !following_set.contains(id.as_str()))
            .collect();

        let mut exclude = following.clone();
        exclude.push(user_id.to_string());

        let since = Utc::now() - Duration::days(CANDIDATE_WINDOW_DAYS);
        let fetch_cap = limit.saturating_mul(FETCH_MULTIPLIER);
        // Over-fetch so the in-memory genre filter still leaves enough
        // candidates to fill the re-ranking pool.
        let raw = self
            .post_repo
            .find_recent_excluding_authors(&exclude, since, fetch_cap.saturating_mul(10))
            .await?;

        let candidates: Vec<post::Model> = raw
            .into_iter()
            .filter(|p| genre_filter_passes(p, &taste.genres))
            .take(usize::try_from(fetch_cap).unwrap_or(usize::MAX))
            .collect();

        let mut scored: Vec<ScoredPost> = candidates
            .into_iter()
            .map(|p| {
                let author_followed = following_set.contains(p.user_id.as_str());
                let author_foaf = foaf.contains(&p.user_id);
                let score = score_candidate(&p, author_followed, author_foaf, &taste);
                ScoredPost { post: p, score }
            })
            .collect();

        // Score descending, recency descending on ties; ids are ULIDs so
        // id order matches creation order.
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.post.created_at.cmp(&a.post.created_at))
                .then_with(|| b.post.id.cmp(&a.post.id))
        });
        scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(scored)
    }

    /// Suggest users to follow based on friend-of-a-friend overlap.
    pub async fn recommend_friends(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<FriendSuggestion>> {
        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Ok(vec![]);
        }

        let following = self.following_repo.find_followee_ids(user_id).await?;
        if following.is_empty() {
            return Ok(vec![]);
        }

        let edges = self.following_repo.find_edges_from(&following).await?;
        let foaf_edges: Vec<(String, String)> = edges
            .into_iter()
            .map(|e| (e.follower_id, e.followee_id))
            .collect();

        let ranked = rank_friend_candidates(user_id, &following, &foaf_edges);
        let top: Vec<(String, usize)> = ranked
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();

        let ids: Vec<String> = top.iter().map(|(id, _)| id.clone()).collect();
        let users = self.user_repo.find_by_ids(&ids).await?;
        let mut by_id: HashMap<String, user::Model> =
            users.into_iter().map(|u| (u.id.clone(), u)).collect();

        Ok(top
            .into_iter()
            .filter_map(|(id, count)| {
                by_id.remove(&id).map(|user| FriendSuggestion {
                    user,
                    mutual_count: count,
                })
            })
            .collect())
    }
}

/// Collect lowercase genre/artist/item-id sets from posts' Spotify content.
fn extract_taste(posts: &[post::Model]) -> TasteProfile {
    let mut taste = TasteProfile::default();

    for post in posts {
        let Some(content) = post.spotify() else {
            continue;
        };
        for genre in &content.genres {
            taste.genres.insert(genre.to_lowercase());
        }
        if let Some(ref artist) = content.artist {
            taste.artists.insert(artist.to_lowercase());
        }
        taste.spotify_ids.insert(content.spotify_id.clone());
    }

    taste
}

/// Case-insensitive genre intersection. An empty preferred set disables
/// the filter entirely.
fn genre_filter_passes(post: &post::Model, preferred_genres: &HashSet<String>) -> bool {
    if preferred_genres.is_empty() {
        return true;
    }

    post.spotify().is_some_and(|content| {
        content
            .genres
            .iter()
            .any(|g| preferred_genres.contains(&g.to_lowercase()))
    })
}

/// Weighted candidate score.
fn score_candidate(
    post: &post::Model,
    author_followed: bool,
    author_foaf: bool,
    taste: &TasteProfile,
) -> f64 {
    let mut score = 0.0;

    // Followed authors are excluded upstream; the weight stays for the
    // case where the exclusion and the score ever diverge.
    if author_followed {
        score += WEIGHT_FOLLOWED_AUTHOR;
    }
    if author_foaf {
        score += WEIGHT_FOAF_AUTHOR;
    }

    score += f64::from(post.likes_count.clamp(0, LIKE_CAP)) * WEIGHT_PER_LIKE;

    if let Some(content) = post.spotify() {
        if let Some(ref artist) = content.artist
            && taste.artists.contains(&artist.to_lowercase())
        {
            score += WEIGHT_ARTIST_MATCH;
        }
        if taste.spotify_ids.contains(&content.spotify_id) {
            score += WEIGHT_EXACT_ITEM_MATCH;
        }
        if content.content_type.eq_ignore_ascii_case("track") {
            score += WEIGHT_TRACK_TYPE;
        }
    }

    score
}

/// Count friend-of-a-friend occurrences and rank candidates.
///
/// Excludes the requester and anyone already followed. Ranking is by
/// occurrence count descending with ascending user id as the tie-break,
/// so equal counts produce a stable order.
fn rank_friend_candidates(
    user_id: &str,
    following: &[String],
    edges: &[(String, String)],
) -> Vec<(String, usize)> {
    let following_set: HashSet<&str> = following.iter().map(String::as_str).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, followee) in edges {
        if followee == user_id || following_set.contains(followee.as_str()) {
            continue;
        }
        *counts.entry(followee.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(id, count)| (id.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rhythme_db::entities::{following, post::SpotifyContent};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn post_with_spotify(
        id: &str,
        user_id: &str,
        likes: i32,
        content: Option<SpotifyContent>,
    ) -> post::Model {
        post::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            text: "listen to this".to_string(),
            image_url: None,
            spotify_content: content.as_ref().map(SpotifyContent::to_json),
            likes_count: likes,
            comments_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn track(spotify_id: &str, artist: &str, genres: &[&str]) -> SpotifyContent {
        SpotifyContent {
            content_type: "track".to_string(),
            spotify_id: spotify_id.to_string(),
            name: "Song".to_string(),
            artist: Some(artist.to_string()),
            image_url: None,
            external_url: None,
            genres: genres.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_full_score_example() {
        // Followed author (+5), 3 likes (+1.5), artist match (+4),
        // exact item match (+6), track type (+1) = 17.5
        let candidate = post_with_spotify("p1", "author", 3, Some(track("id1", "Artist", &[])));

        let mut taste = TasteProfile::default();
        taste.artists.insert("artist".to_string());
        taste.spotify_ids.insert("id1".to_string());

        let score = score_candidate(&candidate, true, false, &taste);
        assert!((score - 17.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_like_bonus_caps_at_ten() {
        let candidate = post_with_spotify("p1", "author", 50, None);
        let taste = TasteProfile::default();

        let score = score_candidate(&candidate, false, false, &taste);
        assert!((score - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_foaf_bonus() {
        let candidate = post_with_spotify("p1", "author", 0, None);
        let taste = TasteProfile::default();

        let score = score_candidate(&candidate, false, true, &taste);
        assert!((score - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_genre_filter_case_insensitive() {
        let mut preferred = HashSet::new();
        preferred.insert("metal".to_string());
        preferred.insert("heavy metal".to_string());

        let candidate =
            post_with_spotify("p1", "u1", 0, Some(track("id", "Band", &["HEAVY METAL"])));
        assert!(genre_filter_passes(&candidate, &preferred));

        let miss = post_with_spotify("p2", "u1", 0, Some(track("id", "Band", &["jazz"])));
        assert!(!genre_filter_passes(&miss, &preferred));
    }

    #[test]
    fn test_genre_filter_disabled_when_no_preferences() {
        let preferred = HashSet::new();
        let no_spotify = post_with_spotify("p1", "u1", 0, None);
        assert!(genre_filter_passes(&no_spotify, &preferred));
    }

    #[test]
    fn test_extract_taste_lowercases_and_dedups() {
        let posts = vec![
            post_with_spotify("p1", "me", 0, Some(track("id1", "Metallica", &["Metal"]))),
            post_with_spotify("p2", "me", 0, Some(track("id2", "METALLICA", &["metal"]))),
        ];

        let taste = extract_taste(&posts);
        assert_eq!(taste.genres.len(), 1);
        assert_eq!(taste.artists.len(), 1);
        assert!(taste.genres.contains("metal"));
    }

    #[tokio::test]
    async fn test_recommend_posts_tolerates_huge_limit() {
        let requester = user::Model {
            id: "user1".to_string(),
            username: "user1".to_string(),
            username_lower: "user1".to_string(),
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
        };

        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[requester]]);
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<following::Model>::new()]);
        let post_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .append_query_results([Vec::<post::Model>::new()]);

        let service = RecommendationService::new(
            PostRepository::new(Arc::new(post_db.into_connection())),
            FollowingRepository::new(Arc::new(following_db.into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
        );

        // The candidate fetch cap saturates instead of overflowing.
        let result = service
            .recommend_posts("user1", Some(u64::MAX))
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_rank_friend_candidates_counts_and_tie_break() {
        let following = vec!["f1".to_string(), "f2".to_string(), "f3".to_string()];
        let edges = vec![
            ("f1".to_string(), "candidate_b".to_string()),
            ("f2".to_string(), "candidate_b".to_string()),
            ("f1".to_string(), "candidate_a".to_string()),
            ("f3".to_string(), "candidate_c".to_string()),
            // already-followed and self are excluded
            ("f2".to_string(), "f3".to_string()),
            ("f3".to_string(), "me".to_string()),
        ];

        let ranked = rank_friend_candidates("me", &following, &edges);

        assert_eq!(ranked[0], ("candidate_b".to_string(), 2));
        // tie between a and c broken by ascending id
        assert_eq!(ranked[1], ("candidate_a".to_string(), 1));
        assert_eq!(ranked[2], ("candidate_c".to_string(), 1));
    }
}
