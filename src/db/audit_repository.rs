//! Audit log storage on SQLite

use async_trait::async_trait;

use super::{parse_column, parse_db_timestamp, AuditStore, SqliteRepository, StoreError, StoreResult};
use crate::models::{AuditDetails, AuditFilter, AuditLogEntry};

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    user_id: String,
    action: String,
    entity_type: String,
    entity_id: String,
    details: String,
    timestamp: String,
}

fn row_to_audit(row: AuditRow) -> StoreResult<AuditLogEntry> {
    let details: AuditDetails = serde_json::from_str(&row.details)
        .map_err(|e| StoreError::Unavailable(format!("column details: {}", e)))?;

    Ok(AuditLogEntry {
        action: parse_column("action", &row.action)?,
        entity_type: parse_column("entity_type", &row.entity_type)?,
        timestamp: parse_db_timestamp(&row.timestamp)?,
        details,
        id: row.id,
        user_id: row.user_id,
        entity_id: row.entity_id,
    })
}

#[async_trait]
impl AuditStore for SqliteRepository {
    async fn append_audit(&self, entry: AuditLogEntry) -> StoreResult<AuditLogEntry> {
        let details = serde_json::Value::Object(entry.details.clone()).to_string();

        sqlx::query(
            r#"
            INSERT INTO audit_log (id, user_id, action, entity_type, entity_id, details, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.entity_type.as_str())
        .bind(&entry.entity_id)
        .bind(details)
        .bind(entry.timestamp.to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(entry)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>> {
        let mut sql = String::from(
            "SELECT id, user_id, action, entity_type, entity_id, details, timestamp FROM audit_log WHERE 1 = 1",
        );
        if filter.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if filter.entity_type.is_some() {
            sql.push_str(" AND entity_type = ?");
        }
        if filter.entity_id.is_some() {
            sql.push_str(" AND entity_id = ?");
        }
        if filter.action.is_some() {
            sql.push_str(" AND action = ?");
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut q = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(ref user_id) = filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(entity_type) = filter.entity_type {
            q = q.bind(entity_type.as_str());
        }
        if let Some(ref entity_id) = filter.entity_id {
            q = q.bind(entity_id);
        }
        if let Some(action) = filter.action {
            q = q.bind(action.as_str());
        }

        let rows = q.fetch_all(self.pool()).await?;
        rows.into_iter().map(row_to_audit).collect()
    }
}
