//! Institution storage on SQLite

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use super::{
    parse_column, parse_db_timestamp, parse_optional_timestamp, InstitutionStore,
    SqliteRepository, StoreError, StoreResult,
};
use crate::models::{
    ContactInfo, Institution, InstitutionFilter, InstitutionPatch, InstitutionStatus,
};

const SELECT_INSTITUTION: &str = r#"
    SELECT id, name, organization_type, status, contact_person, contact_email,
           contact_phone, contact_address, api_endpoint, description,
           created_at, last_active, reviewed_at
    FROM institutions
"#;

#[derive(Debug, sqlx::FromRow)]
struct InstitutionRow {
    id: String,
    name: String,
    organization_type: String,
    status: String,
    contact_person: String,
    contact_email: String,
    contact_phone: Option<String>,
    contact_address: Option<String>,
    api_endpoint: Option<String>,
    description: String,
    created_at: String,
    last_active: Option<String>,
    reviewed_at: Option<String>,
}

fn row_to_institution(row: InstitutionRow) -> StoreResult<Institution> {
    Ok(Institution {
        status: parse_column("status", &row.status)?,
        created_at: parse_db_timestamp(&row.created_at)?,
        last_active: parse_optional_timestamp(row.last_active)?,
        reviewed_at: parse_optional_timestamp(row.reviewed_at)?,
        id: row.id,
        name: row.name,
        organization_type: row.organization_type,
        contact: ContactInfo {
            contact_person: row.contact_person,
            email: row.contact_email,
            phone: row.contact_phone,
            address: row.contact_address,
        },
        api_endpoint: row.api_endpoint,
        description: row.description,
    })
}

impl SqliteRepository {
    async fn fetch_institution(&self, id: &str) -> StoreResult<Option<Institution>> {
        let sql = format!("{} WHERE id = ?", SELECT_INSTITUTION);
        let row = sqlx::query_as::<_, InstitutionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_institution).transpose()
    }
}

#[async_trait]
impl InstitutionStore for SqliteRepository {
    async fn create_institution(&self, institution: Institution) -> StoreResult<Institution> {
        sqlx::query(
            r#"
            INSERT INTO institutions (id, name, organization_type, status, contact_person,
                contact_email, contact_phone, contact_address, api_endpoint, description,
                created_at, last_active, reviewed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&institution.id)
        .bind(&institution.name)
        .bind(&institution.organization_type)
        .bind(institution.status.as_str())
        .bind(&institution.contact.contact_person)
        .bind(&institution.contact.email)
        .bind(&institution.contact.phone)
        .bind(&institution.contact.address)
        .bind(&institution.api_endpoint)
        .bind(&institution.description)
        .bind(institution.created_at.to_rfc3339())
        .bind(institution.last_active.map(|t| t.to_rfc3339()))
        .bind(institution.reviewed_at.map(|t| t.to_rfc3339()))
        .execute(self.pool())
        .await?;

        Ok(institution)
    }

    async fn get_institution(&self, id: &str) -> StoreResult<Option<Institution>> {
        self.fetch_institution(id).await
    }

    async fn list_institutions(&self, filter: &InstitutionFilter) -> StoreResult<Vec<Institution>> {
        let mut sql = format!("{} WHERE 1 = 1", SELECT_INSTITUTION);
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.organization_type.is_some() {
            sql.push_str(" AND organization_type = ? COLLATE NOCASE");
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut q = sqlx::query_as::<_, InstitutionRow>(&sql);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(ref organization_type) = filter.organization_type {
            q = q.bind(organization_type);
        }

        let rows = q.fetch_all(self.pool()).await?;
        rows.into_iter().map(row_to_institution).collect()
    }

    async fn update_institution(
        &self,
        id: &str,
        patch: InstitutionPatch,
        expected_status: Option<InstitutionStatus>,
    ) -> StoreResult<Institution> {
        if patch.is_empty() {
            return self
                .fetch_institution(id)
                .await?
                .ok_or_else(|| StoreError::not_found("institution", id));
        }

        // Only the patched columns are written
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE institutions SET ");
        {
            let mut columns = query.separated(", ");
            if let Some(name) = patch.name {
                columns.push("name = ").push_bind_unseparated(name);
            }
            if let Some(organization_type) = patch.organization_type {
                columns
                    .push("organization_type = ")
                    .push_bind_unseparated(organization_type);
            }
            if let Some(contact) = patch.contact {
                columns
                    .push("contact_person = ")
                    .push_bind_unseparated(contact.contact_person);
                columns
                    .push("contact_email = ")
                    .push_bind_unseparated(contact.email);
                columns
                    .push("contact_phone = ")
                    .push_bind_unseparated(contact.phone);
                columns
                    .push("contact_address = ")
                    .push_bind_unseparated(contact.address);
            }
            if let Some(api_endpoint) = patch.api_endpoint {
                columns
                    .push("api_endpoint = ")
                    .push_bind_unseparated(api_endpoint);
            }
            if let Some(description) = patch.description {
                columns
                    .push("description = ")
                    .push_bind_unseparated(description);
            }
            if let Some(status) = patch.status {
                columns.push("status = ").push_bind_unseparated(status.as_str());
            }
            if let Some(reviewed_at) = patch.reviewed_at {
                columns
                    .push("reviewed_at = ")
                    .push_bind_unseparated(reviewed_at.to_rfc3339());
            }
            if let Some(last_active) = patch.last_active {
                columns
                    .push("last_active = ")
                    .push_bind_unseparated(last_active.to_rfc3339());
            }
        }

        query.push(" WHERE id = ").push_bind(id.to_string());
        if let Some(expected) = expected_status {
            query.push(" AND status = ").push_bind(expected.as_str());
        }

        let result = query.build().execute(self.pool()).await?;

        if result.rows_affected() == 0 {
            return match self.fetch_institution(id).await? {
                None => Err(StoreError::not_found("institution", id)),
                // Lost the race: report what the winner left behind
                Some(current) => Err(StoreError::StatusConflict {
                    entity: "institution",
                    id: id.to_string(),
                    current: current.status.to_string(),
                }),
            };
        }

        tracing::debug!("Updated institution {}", id);
        self.fetch_institution(id)
            .await?
            .ok_or_else(|| StoreError::not_found("institution", id))
    }
}
