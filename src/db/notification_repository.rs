//! Notification storage on SQLite

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    parse_column, parse_db_timestamp, parse_optional_timestamp, NotificationStore,
    SqliteRepository, StoreError, StoreResult,
};
use crate::models::{Notification, NotificationFilter};

const SELECT_NOTIFICATION: &str = r#"
    SELECT id, user_id, title, message, details, type AS notification_type, read,
           created_at, read_at
    FROM notifications
"#;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    title: String,
    message: String,
    details: Option<String>,
    notification_type: String,
    read: bool,
    created_at: String,
    read_at: Option<String>,
}

fn row_to_notification(row: NotificationRow) -> StoreResult<Notification> {
    let details = row
        .details
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| StoreError::Unavailable(format!("column details: {}", e)))?;

    Ok(Notification {
        r#type: parse_column("type", &row.notification_type)?,
        created_at: parse_db_timestamp(&row.created_at)?,
        read_at: parse_optional_timestamp(row.read_at)?,
        details,
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        message: row.message,
        read: row.read,
    })
}

impl SqliteRepository {
    async fn fetch_notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        let sql = format!("{} WHERE id = ?", SELECT_NOTIFICATION);
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_notification).transpose()
    }
}

#[async_trait]
impl NotificationStore for SqliteRepository {
    async fn create_notification(&self, notification: Notification) -> StoreResult<Notification> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, details, type, read,
                created_at, read_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.details.as_ref().map(|d| d.to_string()))
        .bind(notification.r#type.as_str())
        .bind(notification.read)
        .bind(notification.created_at.to_rfc3339())
        .bind(notification.read_at.map(|t| t.to_rfc3339()))
        .execute(self.pool())
        .await?;

        Ok(notification)
    }

    async fn get_notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        self.fetch_notification(id).await
    }

    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> StoreResult<Vec<Notification>> {
        let mut sql = format!("{} WHERE 1 = 1", SELECT_NOTIFICATION);
        if filter.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if filter.unread_only {
            sql.push_str(" AND read = 0");
        }
        if filter.notification_type.is_some() {
            sql.push_str(" AND type = ?");
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut q = sqlx::query_as::<_, NotificationRow>(&sql);
        if let Some(ref user_id) = filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(notification_type) = filter.notification_type {
            q = q.bind(notification_type.as_str());
        }

        let rows = q.fetch_all(self.pool()).await?;
        rows.into_iter().map(row_to_notification).collect()
    }

    async fn set_notification_read(
        &self,
        id: &str,
        read: bool,
        read_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Notification> {
        let result = sqlx::query("UPDATE notifications SET read = ?, read_at = ? WHERE id = ?")
            .bind(read)
            .bind(read_at.map(|t| t.to_rfc3339()))
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("notification", id));
        }

        self.fetch_notification(id)
            .await?
            .ok_or_else(|| StoreError::not_found("notification", id))
    }

    async fn mark_all_notifications_read(
        &self,
        user_id: &str,
        read_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = 1, read_at = ? WHERE user_id = ? AND read = 0",
        )
        .bind(read_at.to_rfc3339())
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
