//! Notification service.

use rhythme_common::{AppError, AppResult, IdGenerator};
use rhythme_db::{
    entities::{notification, notification::NotificationType},
    repositories::NotificationRepository,
};
use sea_orm::Set;

use crate::services::event_publisher::EventPublisherService;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Create a notification and push it to the notifiee's live sockets.
    ///
    /// Self-notifications (notifier == notifiee) are silently skipped.
    pub async fn notify(
        &self,
        notifiee_id: &str,
        notifier_id: Option<&str>,
        notification_type: NotificationType,
        message: &str,
        post_id: Option<&str>,
    ) -> AppResult<Option<notification::Model>> {
        if notifier_id == Some(notifiee_id) {
            return Ok(None);
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            notifiee_id: Set(notifiee_id.to_string()),
            notifier_id: Set(notifier_id.map(ToString::to_string)),
            notification_type: Set(notification_type),
            message: Set(message.to_string()),
            post_id: Set(post_id.map(ToString::to_string)),
            ..Default::default()
        };

        let created = self.notification_repo.create(model).await?;

        if let Some(ref publisher) = self.event_publisher
            && let Err(e) = publisher
                .publish_notification(
                    &created.id,
                    notifiee_id,
                    created.notification_type.as_str(),
                    notifier_id,
                    post_id,
                )
                .await
        {
            tracing::warn!(error = %e, "Failed to publish notification event");
        }

        Ok(Some(created))
    }

    /// Shorthand for a follow notification.
    pub async fn notify_follow(
        &self,
        notifiee_id: &str,
        notifier_id: &str,
        message: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.notify(
            notifiee_id,
            Some(notifier_id),
            NotificationType::Follow,
            message,
            None,
        )
        .await
    }

    /// Notifications for a user, newest first, optionally unread only.
    pub async fn list(
        &self,
        notifiee_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_notifiee(notifiee_id, limit, until_id, unread_only)
            .await
    }

    /// Mark one notification as read.
    pub async fn mark_as_read(&self, id: &str, notifiee_id: &str) -> AppResult<()> {
        let affected = self.notification_repo.mark_as_read(id, notifiee_id).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("notification {id} not found")));
        }

        if let Some(ref publisher) = self.event_publisher
            && let Err(e) = publisher
                .publish_notification_read(notifiee_id, Some(id))
                .await
        {
            tracing::warn!(error = %e, "Failed to publish notification-read event");
        }

        Ok(())
    }

    /// Mark all of a user's notifications as read.
    pub async fn mark_all_as_read(&self, notifiee_id: &str) -> AppResult<u64> {
        let affected = self.notification_repo.mark_all_as_read(notifiee_id).await?;

        if let Some(ref publisher) = self.event_publisher
            && let Err(e) = publisher.publish_notification_read(notifiee_id, None).await
        {
            tracing::warn!(error = %e, "Failed to publish notification-read event");
        }

        Ok(affected)
    }

    /// Count unread notifications.
    pub async fn count_unread(&self, notifiee_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(notifiee_id).await
    }
}
