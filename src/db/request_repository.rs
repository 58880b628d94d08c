//! Access request storage on SQLite

use async_trait::async_trait;

use super::{
    parse_column, parse_db_timestamp, parse_optional_timestamp, RequestStore, SqliteRepository,
    StoreError, StoreResult,
};
use crate::models::{ApiRequest, RequestFilter, RequestPatch, RequestStatus};

const SELECT_REQUEST: &str = r#"
    SELECT id, title, description, purpose, consumer_id, provider_id, status, priority,
           response_format, attributes, submitted_date, response_date, api_endpoint,
           rejection_reason
    FROM api_requests
"#;

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: String,
    title: String,
    description: String,
    purpose: String,
    consumer_id: String,
    provider_id: String,
    status: String,
    priority: String,
    response_format: String,
    attributes: String,
    submitted_date: String,
    response_date: Option<String>,
    api_endpoint: Option<String>,
    rejection_reason: Option<String>,
}

fn row_to_request(row: RequestRow) -> StoreResult<ApiRequest> {
    let attributes: Vec<String> = serde_json::from_str(&row.attributes)
        .map_err(|e| StoreError::Unavailable(format!("column attributes: {}", e)))?;

    Ok(ApiRequest {
        status: parse_column("status", &row.status)?,
        priority: parse_column("priority", &row.priority)?,
        submitted_date: parse_db_timestamp(&row.submitted_date)?,
        response_date: parse_optional_timestamp(row.response_date)?,
        attributes,
        id: row.id,
        title: row.title,
        description: row.description,
        purpose: row.purpose,
        consumer_id: row.consumer_id,
        provider_id: row.provider_id,
        response_format: row.response_format,
        api_endpoint: row.api_endpoint,
        rejection_reason: row.rejection_reason,
    })
}

fn encode_attributes(attributes: &[String]) -> StoreResult<String> {
    serde_json::to_string(attributes)
        .map_err(|e| StoreError::Unavailable(format!("encode attributes: {}", e)))
}

impl SqliteRepository {
    async fn fetch_request(&self, id: &str) -> StoreResult<Option<ApiRequest>> {
        let sql = format!("{} WHERE id = ?", SELECT_REQUEST);
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_request).transpose()
    }
}

#[async_trait]
impl RequestStore for SqliteRepository {
    async fn create_request(&self, request: ApiRequest) -> StoreResult<ApiRequest> {
        sqlx::query(
            r#"
            INSERT INTO api_requests (id, title, description, purpose, consumer_id, provider_id,
                status, priority, response_format, attributes, submitted_date, response_date,
                api_endpoint, rejection_reason)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.purpose)
        .bind(&request.consumer_id)
        .bind(&request.provider_id)
        .bind(request.status.as_str())
        .bind(request.priority.as_str())
        .bind(&request.response_format)
        .bind(encode_attributes(&request.attributes)?)
        .bind(request.submitted_date.to_rfc3339())
        .bind(request.response_date.map(|t| t.to_rfc3339()))
        .bind(&request.api_endpoint)
        .bind(&request.rejection_reason)
        .execute(self.pool())
        .await?;

        Ok(request)
    }

    async fn get_request(&self, id: &str) -> StoreResult<Option<ApiRequest>> {
        self.fetch_request(id).await
    }

    async fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ApiRequest>> {
        let mut sql = format!("{} WHERE 1 = 1", SELECT_REQUEST);
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.consumer_id.is_some() {
            sql.push_str(" AND consumer_id = ?");
        }
        if filter.provider_id.is_some() {
            sql.push_str(" AND provider_id = ?");
        }
        if filter.priority.is_some() {
            sql.push_str(" AND priority = ?");
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut q = sqlx::query_as::<_, RequestRow>(&sql);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(ref consumer_id) = filter.consumer_id {
            q = q.bind(consumer_id);
        }
        if let Some(ref provider_id) = filter.provider_id {
            q = q.bind(provider_id);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority.as_str());
        }

        let rows = q.fetch_all(self.pool()).await?;
        rows.into_iter().map(row_to_request).collect()
    }

    async fn update_request(
        &self,
        id: &str,
        patch: RequestPatch,
        expected_status: Option<RequestStatus>,
    ) -> StoreResult<ApiRequest> {
        let mut request = self
            .fetch_request(id)
            .await?
            .ok_or_else(|| StoreError::not_found("request", id))?;

        let guard_status = expected_status.unwrap_or(request.status);
        if request.status != guard_status {
            return Err(StoreError::StatusConflict {
                entity: "request",
                id: id.to_string(),
                current: request.status.to_string(),
            });
        }

        patch.apply(&mut request);

        let result = sqlx::query(
            r#"
            UPDATE api_requests
            SET status = ?, response_date = ?, rejection_reason = ?, api_endpoint = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(request.status.as_str())
        .bind(request.response_date.map(|t| t.to_rfc3339()))
        .bind(&request.rejection_reason)
        .bind(&request.api_endpoint)
        .bind(id)
        .bind(guard_status.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return match self.fetch_request(id).await? {
                None => Err(StoreError::not_found("request", id)),
                Some(current) => Err(StoreError::StatusConflict {
                    entity: "request",
                    id: id.to_string(),
                    current: current.status.to_string(),
                }),
            };
        }

        Ok(request)
    }
}
