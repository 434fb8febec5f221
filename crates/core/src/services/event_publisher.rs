//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events.
//! The actual implementation is provided by the streaming layer.

use async_trait::async_trait;
use rhythme_common::AppResult;
use std::sync::Arc;

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events
/// without directly depending on the WebSocket implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a post lifecycle event (created/liked/commented/deleted).
    async fn publish_post_event(&self, post_id: &str, user_id: &str, kind: &str) -> AppResult<()>;

    /// Publish a notification event.
    async fn publish_notification(
        &self,
        id: &str,
        notifiee_id: &str,
        notification_type: &str,
        notifier_id: Option<&str>,
        post_id: Option<&str>,
    ) -> AppResult<()>;

    /// Publish a notification-read event.
    async fn publish_notification_read(
        &self,
        notifiee_id: &str,
        notification_id: Option<&str>,
    ) -> AppResult<()>;

    /// Publish a direct message event.
    async fn publish_direct_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> AppResult<()>;
}

/// A no-op implementation of EventPublisher for testing or when real-time events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_post_event(
        &self,
        _post_id: &str,
        _user_id: &str,
        _kind: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_notification(
        &self,
        _id: &str,
        _notifiee_id: &str,
        _notification_type: &str,
        _notifier_id: Option<&str>,
        _post_id: Option<&str>,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_notification_read(
        &self,
        _notifiee_id: &str,
        _notification_id: Option<&str>,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_direct_message(
        &self,
        _id: &str,
        _conversation_id: &str,
        _sender_id: &str,
        _recipient_id: &str,
        _text: &str,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed EventPublisher trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
