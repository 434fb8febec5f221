//! Direct messaging endpoints.
//!
//! New messages are also pushed to both participants over the streaming
//! WebSocket; these endpoints cover history and conversation management.

use axum::{Json, Router, extract::State, routing::post};
use rhythme_common::AppResult;
use rhythme_core::SendMessageInput;
use rhythme_db::entities::{
    conversation::Model as ConversationModel, message::Model as MessageModel,
};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Conversation representation, viewed from one participant's side.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub partner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
    pub created_at: String,
}

impl ConversationResponse {
    fn for_viewer(c: ConversationModel, viewer_id: &str) -> Self {
        let partner_id = c.partner_of(viewer_id).to_string();
        Self {
            id: c.id,
            partner_id,
            last_message_text: c.last_message_text,
            last_message_sender_id: c.last_message_sender_id,
            last_message_at: c.last_message_at.map(|t| t.to_rfc3339()),
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Message representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: String,
}

impl From<MessageModel> for MessageResponse {
    fn from(m: MessageModel) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            text: m.text,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// Get-or-create conversation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetConversationRequest {
    pub user_id: String,
}

/// Get the conversation with another user, creating it if absent.
async fn get_or_create_conversation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<GetConversationRequest>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    let conversation = state
        .messaging_service
        .get_or_create_conversation(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(ConversationResponse::for_viewer(
        conversation,
        &user.id,
    )))
}

/// List conversations request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConversationsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Conversations for the authenticated user, most recent activity first.
async fn list_conversations(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListConversationsRequest>,
) -> AppResult<ApiResponse<Vec<ConversationResponse>>> {
    let limit = req.limit.min(100);
    let conversations = state
        .messaging_service
        .list_conversations(&user.id, limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(
        conversations
            .into_iter()
            .map(|c| ConversationResponse::for_viewer(c, &user.id))
            .collect(),
    ))
}

/// Send message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub text: String,
}

/// Send a direct message within a conversation.
async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .messaging_service
        .send_message(
            &user.id,
            &req.conversation_id,
            SendMessageInput { text: req.text },
        )
        .await?;
    Ok(ApiResponse::ok(message.into()))
}

/// Message history request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesRequest {
    pub conversation_id: String,
    #[serde(default = "default_message_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_message_limit() -> u64 {
    50
}

/// Message history, newest first. Participants only.
async fn list_messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListMessagesRequest>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let limit = req.limit.min(100);
    let messages = state
        .messaging_service
        .list_messages(
            &user.id,
            &req.conversation_id,
            limit,
            req.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(
        messages.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversation", post(get_or_create_conversation))
        .route("/conversations", post(list_conversations))
        .route("/send", post(send_message))
        .route("/history", post(list_messages))
}
