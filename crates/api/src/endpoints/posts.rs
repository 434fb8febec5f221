//! Post, like, comment, and feed endpoints.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_core::{
    CreateCommentInput, CreatePostInput, LikeOutcome, ScoredPost, UpdatePostInput,
};
use rhythme_db::entities::post::{
    Model as PostModel, SpotifyContent,
};
use rhythme_db::entities::post_comment::Model as CommentModel;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Post representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotify_content: Option<SpotifyContent>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: String,
}

impl From<PostModel> for PostResponse {
    fn from(post: PostModel) -> Self {
        let spotify_content = post.spotify();
        Self {
            id: post.id,
            user_id: post.user_id,
            text: post.text,
            image_url: post.image_url,
            spotify_content,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            created_at: post.created_at.to_rfc3339(),
        }
    }
}

/// Comment representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

impl From<CommentModel> for CommentResponse {
    fn from(c: CommentModel) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            user_id: c.user_id,
            text: c.text,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Create post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub text: String,
    pub image_url: Option<String>,
    pub spotify_content: Option<SpotifyContent>,
}

/// Create a post.
async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state
        .post_service
        .create(
            &user.id,
            CreatePostInput {
                text: req.text,
                image_url: req.image_url,
                spotify_content: req.spotify_content,
            },
        )
        .await?;
    Ok(ApiResponse::ok(post.into()))
}

/// Request naming a single post.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPostRequest {
    pub post_id: String,
}

/// Show a post, subject to the author's posts privacy.
async fn show_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetPostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.get_visible(&user.id, &req.post_id).await?;
    Ok(ApiResponse::ok(post.into()))
}

/// Update post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub post_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
}

/// Update a post. Author only.
async fn update_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state
        .post_service
        .update(
            &user.id,
            &req.post_id,
            UpdatePostInput {
                text: req.text,
                image_url: req.image_url,
            },
        )
        .await?;
    Ok(ApiResponse::ok(post.into()))
}

/// Delete a post. Author or admin only.
async fn delete_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetPostRequest>,
) -> AppResult<ApiResponse<()>> {
    state.post_service.delete(&user.id, &req.post_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Paginated timeline request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

/// Home timeline: own posts plus posts from followed users, newest first.
async fn timeline(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TimelineRequest>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = req.limit.min(100);
    let posts = state
        .post_service
        .feed(&user.id, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(posts.into_iter().map(Into::into).collect()))
}

/// Posts by a single author.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsByUserRequest {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Posts by a single author, subject to their posts privacy.
async fn posts_by_user(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PostsByUserRequest>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = req.limit.min(100);
    let posts = state
        .post_service
        .by_author(&user.id, &req.user_id, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(posts.into_iter().map(Into::into).collect()))
}

/// Like toggle response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
}

/// Toggle a like on a post.
async fn toggle_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetPostRequest>,
) -> AppResult<ApiResponse<LikeResponse>> {
    let outcome = state.post_service.toggle_like(&user.id, &req.post_id).await?;
    Ok(ApiResponse::ok(LikeResponse {
        liked: matches!(outcome, LikeOutcome::Liked),
    }))
}

/// Create comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub text: String,
}

/// Comment on a post.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .post_service
        .comment(&user.id, &req.post_id, CreateCommentInput { text: req.text })
        .await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// List comments request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsRequest {
    pub post_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Comments on a post, oldest first.
async fn list_comments(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListCommentsRequest>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let limit = req.limit.min(100);
    let comments = state
        .post_service
        .comments(&req.post_id, limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    ))
}

/// Post recommendation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendPostsRequest {
    pub limit: Option<u64>,
}

/// Recommended post with its score.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPostResponse {
    pub post: PostResponse,
    pub score: f64,
}

impl From<ScoredPost> for ScoredPostResponse {
    fn from(s: ScoredPost) -> Self {
        Self {
            post: s.post.into(),
            score: s.score,
        }
    }
}

/// Recommend recent posts scored by social proximity and music taste.
async fn recommend_posts(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RecommendPostsRequest>,
) -> AppResult<ApiResponse<Vec<ScoredPostResponse>>> {
    let limit = req.limit.map(|l| l.clamp(1, 50));
    let scored = state
        .recommendation_service
        .recommend_posts(&user.id, limit)
        .await?;
    Ok(ApiResponse::ok(scored.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_post))
        .route("/show", post(show_post))
        .route("/update", post(update_post))
        .route("/delete", post(delete_post))
        .route("/timeline", post(timeline))
        .route("/by-user", post(posts_by_user))
        .route("/like", post(toggle_like))
        .route("/comments/create", post(create_comment))
        .route("/comments/list", post(list_comments))
        .route("/recommendations", post(recommend_posts))
}
