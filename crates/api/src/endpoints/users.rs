//! User profile, social graph, and privacy endpoints.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::{AppError, AppResult};
use rhythme_core::{FriendSuggestion, UpdatePrivacyInput, UpdateProfileInput};
use rhythme_db::entities::{user::Model as UserModel, user_profile::PrivacySetting};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Public user representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub followers_count: i32,
    pub following_count: i32,
    pub posts_count: i32,
    pub created_at: String,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            followers_count: user.followers_count,
            following_count: user.following_count,
            posts_count: user.posts_count,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Get the authenticated user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(user.into())
}

/// Show user request. Exactly one of `user_id` / `username` is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowUserRequest {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Show a user, subject to their profile privacy.
async fn show_user(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowUserRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let owner_id = match (req.user_id, req.username) {
        (Some(id), _) => id,
        (None, Some(username)) => state.user_service.get_by_username(&username).await?.id,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either userId or username is required".to_string(),
            ));
        }
    };

    let target = state.user_service.get_visible(&user.id, &owner_id).await?;
    Ok(ApiResponse::ok(target.into()))
}

/// Update profile request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Update the authenticated user's profile.
async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state
        .user_service
        .update_profile(
            &user.id,
            UpdateProfileInput {
                name: req.name,
                bio: req.bio,
                avatar_url: req.avatar_url,
            },
        )
        .await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Update privacy request. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrivacyRequest {
    pub profile_privacy: Option<PrivacySetting>,
    pub posts_privacy: Option<PrivacySetting>,
    pub friends_privacy: Option<PrivacySetting>,
}

/// Privacy settings response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyResponse {
    pub profile_privacy: PrivacySetting,
    pub posts_privacy: PrivacySetting,
    pub friends_privacy: PrivacySetting,
}

/// Update per-section privacy settings.
async fn update_privacy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePrivacyRequest>,
) -> AppResult<ApiResponse<PrivacyResponse>> {
    let profile = state
        .user_service
        .update_privacy(
            &user.id,
            UpdatePrivacyInput {
                profile_privacy: req.profile_privacy,
                posts_privacy: req.posts_privacy,
                friends_privacy: req.friends_privacy,
            },
        )
        .await?;
    Ok(ApiResponse::ok(PrivacyResponse {
        profile_privacy: profile.profile_privacy,
        posts_privacy: profile.posts_privacy,
        friends_privacy: profile.friends_privacy,
    }))
}

/// Search users request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    30
}

/// Search users by username or display name.
async fn search_users(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SearchUsersRequest>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let limit = req.limit.min(100);
    let users = state
        .user_service
        .search(&req.query, limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

/// Request naming a single target user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetUserRequest {
    pub user_id: String,
}

/// Follow a user.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetUserRequest>,
) -> AppResult<ApiResponse<()>> {
    state.following_service.follow(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetUserRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .following_service
        .unfollow(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Users followed by the target, subject to their friends privacy.
async fn following(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetUserRequest>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .user_service
        .get_following(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

/// Followers of the target, subject to their friends privacy.
async fn followers(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetUserRequest>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .user_service
        .get_followers(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

/// Block a user.
async fn block(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetUserRequest>,
) -> AppResult<ApiResponse<()>> {
    state.blocking_service.block(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Unblock a user.
async fn unblock(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetUserRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .blocking_service
        .unblock(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Users blocked by the authenticated user.
async fn blocked(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state.blocking_service.list_blocked(&user.id).await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

/// Friend recommendation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendFriendsRequest {
    #[serde(default = "default_recommendation_limit")]
    pub limit: u64,
}

const fn default_recommendation_limit() -> u64 {
    5
}

/// Friend suggestion response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendSuggestionResponse {
    pub user: UserResponse,
    pub mutual_count: usize,
}

impl From<FriendSuggestion> for FriendSuggestionResponse {
    fn from(s: FriendSuggestion) -> Self {
        Self {
            user: s.user.into(),
            mutual_count: s.mutual_count,
        }
    }
}

/// Suggest users to follow based on shared follows.
async fn recommend_friends(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RecommendFriendsRequest>,
) -> AppResult<ApiResponse<Vec<FriendSuggestionResponse>>> {
    let limit = req.limit.clamp(1, 50);
    let suggestions = state
        .recommendation_service
        .recommend_friends(&user.id, limit)
        .await?;
    Ok(ApiResponse::ok(
        suggestions.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", post(me))
        .route("/show", post(show_user))
        .route("/update-profile", post(update_profile))
        .route("/update-privacy", post(update_privacy))
        .route("/search", post(search_users))
        .route("/follow", post(follow))
        .route("/unfollow", post(unfollow))
        .route("/following", post(following))
        .route("/followers", post(followers))
        .route("/block", post(block))
        .route("/unblock", post(unblock))
        .route("/blocked", post(blocked))
        .route("/recommendations", post(recommend_friends))
}
