//! Authentication and account lifecycle endpoints.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_core::{ChangePasswordInput, LoginInput, RegisterInput, ResetPasswordInput};
use rhythme_db::entities::user::Model as UserModel;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Signup request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Signin request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Authentication response: the user together with its bearer token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub token: String,
}

impl From<UserModel> for AuthResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            token: user.token.unwrap_or_default(),
        }
    }
}

/// Token response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
}

/// Create a new account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = state
        .account_service
        .register(RegisterInput {
            username: req.username,
            email: req.email,
            password: req.password,
            name: req.name,
        })
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Sign in with username and password.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = state
        .account_service
        .login(LoginInput {
            username: req.username,
            password: req.password,
        })
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Sign out by rotating the token, invalidating the presented one.
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.account_service.regenerate_token(&user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Issue a fresh token, invalidating the old one.
async fn regenerate_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let token = state.account_service.regenerate_token(&user.id).await?;
    Ok(ApiResponse::ok(TokenResponse { token }))
}

/// Password reset request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

/// Request a password reset email.
///
/// Always succeeds so callers cannot probe which addresses exist.
async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<RequestPasswordResetRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .account_service
        .request_password_reset(&req.email)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Password reset completion request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Complete a password reset with an emailed token.
async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .account_service
        .reset_password(ResetPasswordInput {
            token: req.token,
            new_password: req.new_password,
        })
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Password change request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Change the password, verifying the current one first.
async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .account_service
        .change_password(
            &user.id,
            ChangePasswordInput {
                current_password: req.current_password,
                new_password: req.new_password,
            },
        )
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Deactivate the authenticated account.
async fn deactivate(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.account_service.deactivate(&user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Reactivate a deactivated account.
///
/// Deactivated accounts hold no token, so this re-proves the password.
async fn reactivate(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let user = state
        .account_service
        .verify_credentials(&req.username, &req.password)
        .await?;
    let token = state.account_service.reactivate(&user.id).await?;
    Ok(ApiResponse::ok(TokenResponse { token }))
}

/// Soft-delete the authenticated account.
async fn delete_account(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.account_service.delete(&user.id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/regenerate-token", post(regenerate_token))
        .route("/request-password-reset", post(request_password_reset))
        .route("/reset-password", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/deactivate", post(deactivate))
        .route("/reactivate", post(reactivate))
        .route("/delete-account", post(delete_account))
}
