//! User storage on SQLite

use async_trait::async_trait;

use super::{
    parse_column, parse_db_timestamp, parse_optional_timestamp, SqliteRepository, StoreError,
    StoreResult, UserStore,
};
use crate::models::{User, UserFilter, UserPatch};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    role: String,
    institution_id: Option<String>,
    created_at: String,
    last_login: Option<String>,
}

fn row_to_user(row: UserRow) -> StoreResult<User> {
    Ok(User {
        role: parse_column("role", &row.role)?,
        created_at: parse_db_timestamp(&row.created_at)?,
        last_login: parse_optional_timestamp(row.last_login)?,
        id: row.id,
        name: row.name,
        email: row.email,
        institution_id: row.institution_id,
    })
}

#[async_trait]
impl UserStore for SqliteRepository {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, institution_id, created_at, last_login)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.institution_id)
        .bind(user.created_at.to_rfc3339())
        .bind(user.last_login.map(|t| t.to_rfc3339()))
        .execute(self.pool())
        .await?;

        Ok(user)
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, institution_id, created_at, last_login FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_user).transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let mut sql = String::from(
            "SELECT id, name, email, role, institution_id, created_at, last_login FROM users WHERE 1 = 1",
        );
        if filter.role.is_some() {
            sql.push_str(" AND role = ?");
        }
        if filter.institution_id.is_some() {
            sql.push_str(" AND institution_id = ?");
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut q = sqlx::query_as::<_, UserRow>(&sql);
        if let Some(role) = filter.role {
            q = q.bind(role.as_str());
        }
        if let Some(ref institution_id) = filter.institution_id {
            q = q.bind(institution_id);
        }

        let rows = q.fetch_all(self.pool()).await?;
        rows.into_iter().map(row_to_user).collect()
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<User> {
        let mut user = self
            .get_user(id)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        patch.apply(&mut user);

        sqlx::query(
            "UPDATE users SET name = ?, role = ?, institution_id = ?, last_login = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.institution_id)
        .bind(user.last_login.map(|t| t.to_rfc3339()))
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(user)
    }
}
