//! WebSocket streaming API.
//!
//! One broadcast bus carries addressed events; each socket subscribes and
//! forwards only the events addressed to its user (or to everyone).

#![allow(missing_docs)]

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use rhythme_common::AppResult;
use rhythme_core::EventPublisher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

/// Server-to-client stream events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum WsEvent {
    /// New direct message.
    #[serde(rename = "message:new")]
    MessageNew {
        id: String,
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "senderId")]
        sender_id: String,
        text: String,
    },
    /// New notification.
    #[serde(rename = "notification:new")]
    NotificationNew {
        id: String,
        #[serde(rename = "notificationType")]
        notification_type: String,
        #[serde(rename = "notifierId")]
        notifier_id: Option<String>,
        #[serde(rename = "postId")]
        post_id: Option<String>,
    },
    /// Notification(s) marked read.
    #[serde(rename = "notification:read")]
    NotificationRead {
        #[serde(rename = "notificationId")]
        notification_id: Option<String>,
    },
    /// Post lifecycle event (created/liked/commented/deleted).
    #[serde(rename = "post:event")]
    PostEvent {
        #[serde(rename = "postId")]
        post_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        kind: String,
    },
}

/// Who an event is delivered to.
#[derive(Debug, Clone)]
pub enum Recipients {
    /// Every connected socket.
    All,
    /// Only sockets authenticated as one of these users.
    Users(Vec<String>),
}

/// An event together with its addressing.
#[derive(Debug, Clone)]
pub struct AddressedEvent {
    pub recipients: Recipients,
    pub event: WsEvent,
}

impl AddressedEvent {
    fn targets(&self, user_id: Option<&str>) -> bool {
        match &self.recipients {
            Recipients::All => true,
            Recipients::Users(ids) => {
                user_id.is_some_and(|id| ids.iter().any(|target| target == id))
            }
        }
    }
}

/// Shared state for streaming.
#[derive(Clone)]
pub struct StreamingState {
    pub tx: Arc<broadcast::Sender<AddressedEvent>>,
}

impl StreamingState {
    /// Create a new streaming state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx: Arc::new(tx) }
    }

    /// Publish an event; lagging or absent receivers are fine.
    pub fn publish(&self, recipients: Recipients, event: WsEvent) {
        let _ = self.tx.send(AddressedEvent { recipients, event });
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

/// [`EventPublisher`] backed by the in-process broadcast bus.
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    streaming: StreamingState,
}

impl BroadcastEventPublisher {
    /// Create a new broadcast-backed event publisher.
    #[must_use]
    pub const fn new(streaming: StreamingState) -> Self {
        Self { streaming }
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish_post_event(&self, post_id: &str, user_id: &str, kind: &str) -> AppResult<()> {
        self.streaming.publish(
            Recipients::All,
            WsEvent::PostEvent {
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
                kind: kind.to_string(),
            },
        );
        Ok(())
    }

    async fn publish_notification(
        &self,
        id: &str,
        notifiee_id: &str,
        notification_type: &str,
        notifier_id: Option<&str>,
        post_id: Option<&str>,
    ) -> AppResult<()> {
        self.streaming.publish(
            Recipients::Users(vec![notifiee_id.to_string()]),
            WsEvent::NotificationNew {
                id: id.to_string(),
                notification_type: notification_type.to_string(),
                notifier_id: notifier_id.map(ToString::to_string),
                post_id: post_id.map(ToString::to_string),
            },
        );
        Ok(())
    }

    async fn publish_notification_read(
        &self,
        notifiee_id: &str,
        notification_id: Option<&str>,
    ) -> AppResult<()> {
        self.streaming.publish(
            Recipients::Users(vec![notifiee_id.to_string()]),
            WsEvent::NotificationRead {
                notification_id: notification_id.map(ToString::to_string),
            },
        );
        Ok(())
    }

    async fn publish_direct_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> AppResult<()> {
        self.streaming.publish(
            Recipients::Users(vec![sender_id.to_string(), recipient_id.to_string()]),
            WsEvent::MessageNew {
                id: id.to_string(),
                conversation_id: conversation_id.to_string(),
                sender_id: sender_id.to_string(),
                text: text.to_string(),
            },
        );
        Ok(())
    }
}

/// WebSocket handler for streaming.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("New streaming connection");

    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, query: StreamQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Authenticate if token provided; anonymous sockets only receive
    // broadcast events.
    let user = if let Some(token) = &query.token {
        match state.user_service.authenticate_by_token(token).await {
            Ok(u) => Some(u),
            Err(e) => {
                warn!("Streaming auth failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let user_id = user.map(|u| u.id);

    info!(user_id = ?user_id, "Streaming connection established");

    let mut rx = state.streaming.tx.subscribe();

    loop {
        tokio::select! {
            Some(msg) = receiver.next() => {
                match msg {
                    Ok(Message::Close(_)) => {
                        info!("Client closed connection");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            Ok(addressed) = rx.recv() => {
                if addressed.targets(user_id.as_deref()) {
                    let json = serde_json::to_string(&addressed.event).unwrap_or_default();
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    info!("Streaming connection closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = WsEvent::MessageNew {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "u1".to_string(),
            text: "hey".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message:new");
        assert_eq!(json["body"]["conversationId"], "c1");
    }

    #[test]
    fn test_addressing() {
        let to_user = AddressedEvent {
            recipients: Recipients::Users(vec!["u1".to_string()]),
            event: WsEvent::NotificationRead {
                notification_id: None,
            },
        };

        assert!(to_user.targets(Some("u1")));
        assert!(!to_user.targets(Some("u2")));
        assert!(!to_user.targets(None));

        let broadcast = AddressedEvent {
            recipients: Recipients::All,
            event: WsEvent::PostEvent {
                post_id: "p1".to_string(),
                user_id: "u1".to_string(),
                kind: "created".to_string(),
            },
        };

        assert!(broadcast.targets(None));
    }
}
