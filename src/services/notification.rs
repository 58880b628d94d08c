//! Notification dispatcher
//!
//! Persists in-app notifications and hands every new notification off on a
//! broadcast channel. Delivery to mail or push gateways and the SSE stream
//! consume that channel; a send with no subscribers is not an error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::Repository;
use crate::models::{
    parse_optional, CreateNotificationRequest, ListResult, Notification, NotificationFilter,
    NotificationQuery, NotificationStats, NotificationType, UserFilter,
};
use crate::utils::validation::require_non_blank;
use crate::utils::{AppError, AppResult};

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn Repository>,
    sender: broadcast::Sender<Notification>,
}

impl NotificationService {
    /// Create a new notification service with the given outbound capacity
    pub fn new(repo: Arc<dyn Repository>, channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self { repo, sender }
    }

    /// Subscribe to newly created notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Create an unread notification for one user and publish it
    pub async fn notify(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        notification_type: NotificationType,
        details: Option<serde_json::Value>,
    ) -> AppResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            details,
            r#type: notification_type,
            read: false,
            created_at: Utc::now(),
            read_at: None,
        };

        let notification = self.repo.create_notification(notification).await?;

        if self.sender.send(notification.clone()).is_err() {
            debug!("No subscribers for notification {}", notification.id);
        }

        Ok(notification)
    }

    /// Create a notification from an API payload
    pub async fn create(&self, req: CreateNotificationRequest) -> AppResult<Notification> {
        let user_id = require_non_blank("userId", Some(&req.user_id))?;
        let title = require_non_blank("title", Some(&req.title))?;
        let message = require_non_blank("message", Some(&req.message))?;
        let notification_type =
            parse_optional::<NotificationType>("type", req.r#type.as_deref())?.unwrap_or_default();

        self.notify(&user_id, &title, &message, notification_type, req.details)
            .await
    }

    pub async fn get(&self, id: &str) -> AppResult<Notification> {
        self.repo
            .get_notification(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("notification {} not found", id)))
    }

    /// Mark one notification read; marking a read notification is a no-op
    pub async fn mark_read(&self, id: &str) -> AppResult<Notification> {
        self.set_read(id, true).await
    }

    /// Mark one notification unread; marking an unread notification is a no-op
    pub async fn mark_unread(&self, id: &str) -> AppResult<Notification> {
        self.set_read(id, false).await
    }

    pub async fn set_read(&self, id: &str, read: bool) -> AppResult<Notification> {
        let current = self.get(id).await?;
        if current.read == read {
            return Ok(current);
        }

        let read_at = read.then(Utc::now);
        Ok(self.repo.set_notification_read(id, read, read_at).await?)
    }

    /// Mark every unread notification of a user as read; returns the count
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        let user_id = require_non_blank("userId", Some(user_id))?;
        let changed = self
            .repo
            .mark_all_notifications_read(&user_id, Utc::now())
            .await?;
        debug!("Marked {} notifications read for {}", changed, user_id);
        Ok(changed)
    }

    /// A user's notifications, newest first
    pub async fn list_for_user(
        &self,
        query: &NotificationQuery,
    ) -> AppResult<ListResult<Notification>> {
        let user_id = require_non_blank("userId", query.user_id.as_deref())?;
        let filter = NotificationFilter {
            user_id: Some(user_id),
            unread_only: query.unread_only.unwrap_or(false),
            notification_type: parse_optional("type", query.r#type.as_deref())?,
        };

        let mut notifications = self.repo.list_notifications(&filter).await?;
        notifications.reverse();

        Ok(ListResult::paginate(notifications, query.offset, query.limit))
    }

    pub async fn stats(&self, user_id: &str) -> AppResult<NotificationStats> {
        let user_id = require_non_blank("userId", Some(user_id))?;
        let notifications = self
            .repo
            .list_notifications(&NotificationFilter::for_user(user_id))
            .await?;

        let mut by_type: HashMap<String, usize> = [
            NotificationType::Info,
            NotificationType::Success,
            NotificationType::Warning,
            NotificationType::Error,
        ]
        .iter()
        .map(|t| (t.to_string(), 0))
        .collect();
        for notification in &notifications {
            *by_type.entry(notification.r#type.to_string()).or_insert(0) += 1;
        }

        Ok(NotificationStats {
            total: notifications.len(),
            unread: notifications.iter().filter(|n| !n.read).count(),
            by_type,
        })
    }

    /// Recipient ids for an institution: its registered users, or its contact
    /// email when no user is registered for it
    pub async fn recipients_for(&self, institution_id: &str) -> AppResult<Vec<String>> {
        let users = self
            .repo
            .list_users(&UserFilter {
                institution_id: Some(institution_id.to_string()),
                ..Default::default()
            })
            .await?;
        if !users.is_empty() {
            return Ok(users.into_iter().map(|u| u.id).collect());
        }

        let institution = self
            .repo
            .get_institution(institution_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("institution {} not found", institution_id)))?;
        Ok(vec![institution.contact.email])
    }

    /// Notify every recipient of an institution
    pub async fn notify_institution(
        &self,
        institution_id: &str,
        title: &str,
        message: &str,
        notification_type: NotificationType,
        details: Option<serde_json::Value>,
    ) -> AppResult<Vec<Notification>> {
        let recipients = self.recipients_for(institution_id).await?;
        let mut sent = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            sent.push(
                self.notify(&recipient, title, message, notification_type, details.clone())
                    .await?,
            );
        }
        Ok(sent)
    }

    /// Tell an institution's recipients how their registration was decided
    pub async fn notify_institution_approval(
        &self,
        institution_id: &str,
        institution_name: &str,
        approved: bool,
    ) -> AppResult<Vec<Notification>> {
        let (title, message, notification_type) = if approved {
            (
                "Institution approved",
                format!(
                    "{} has been approved and can now exchange data on the portal.",
                    institution_name
                ),
                NotificationType::Success,
            )
        } else {
            (
                "Institution registration rejected",
                format!(
                    "The registration of {} was not approved. Contact the portal administrators for details.",
                    institution_name
                ),
                NotificationType::Error,
            )
        };

        let sent = self
            .notify_institution(
                institution_id,
                title,
                &message,
                notification_type,
                Some(json!({ "institutionId": institution_id, "approved": approved })),
            )
            .await?;
        info!(
            institution_id,
            approved,
            recipients = sent.len(),
            "Sent institution decision notification"
        );
        Ok(sent)
    }
}
