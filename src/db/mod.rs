//! Entity repository
//!
//! Abstract storage for institutions, access requests, users, notifications
//! and audit log entries. Services only talk to the [`Repository`] trait; two
//! backends implement it:
//! - [`MemoryRepository`]: in-process tables, selected with `memory://`
//! - [`SqliteRepository`]: SQLite via sqlx, selected with `sqlite:` URLs
//!
//! Status changes are compare-and-set: callers pass the status they expect
//! the record to be in, and the write fails with
//! [`StoreError::StatusConflict`] when another writer got there first.

mod audit_repository;
mod institution_repository;
mod memory;
pub mod migrations;
mod notification_repository;
mod request_repository;
mod user_repository;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::models::{
    ApiRequest, AuditFilter, AuditLogEntry, Institution, InstitutionFilter, InstitutionPatch,
    InstitutionStatus, Notification, NotificationFilter, RequestFilter, RequestPatch,
    RequestStatus, User, UserFilter, UserPatch,
};

pub use memory::MemoryRepository;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Repository errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Compare-and-set on status failed
    #[error("{entity} {id} is {current}")]
    StatusConflict {
        entity: &'static str,
        id: String,
        current: String,
    },

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait InstitutionStore: Send + Sync {
    async fn create_institution(&self, institution: Institution) -> StoreResult<Institution>;

    async fn get_institution(&self, id: &str) -> StoreResult<Option<Institution>>;

    /// Matching institutions in insertion order
    async fn list_institutions(&self, filter: &InstitutionFilter) -> StoreResult<Vec<Institution>>;

    /// Apply a partial update. When `expected_status` is set, the write only
    /// happens if the stored status still equals it.
    async fn update_institution(
        &self,
        id: &str,
        patch: InstitutionPatch,
        expected_status: Option<InstitutionStatus>,
    ) -> StoreResult<Institution>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create_request(&self, request: ApiRequest) -> StoreResult<ApiRequest>;

    async fn get_request(&self, id: &str) -> StoreResult<Option<ApiRequest>>;

    /// Matching requests in insertion order
    async fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ApiRequest>>;

    async fn update_request(
        &self,
        id: &str,
        patch: RequestPatch,
        expected_status: Option<RequestStatus>,
    ) -> StoreResult<ApiRequest>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is taken
    async fn create_user(&self, user: User) -> StoreResult<User>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<User>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, notification: Notification) -> StoreResult<Notification>;

    async fn get_notification(&self, id: &str) -> StoreResult<Option<Notification>>;

    /// Matching notifications in insertion order
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> StoreResult<Vec<Notification>>;

    /// The read flag is the only mutable field of a notification
    async fn set_notification_read(
        &self,
        id: &str,
        read: bool,
        read_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Notification>;

    /// Mark every unread notification of a user as read; returns the count
    async fn mark_all_notifications_read(
        &self,
        user_id: &str,
        read_at: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

/// Append-only audit storage
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: AuditLogEntry) -> StoreResult<AuditLogEntry>;

    /// Matching entries in chronological (append) order
    async fn list_audit(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>>;
}

/// Full storage contract used by the services
#[async_trait]
pub trait Repository:
    InstitutionStore + RequestStore + UserStore + NotificationStore + AuditStore
{
    /// Backend name, for health reporting
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Initialize the SQLite connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let in_memory = config.url.contains(":memory:");

    let connect_options = config
        .url
        .parse::<SqliteConnectOptions>()
        .context("Failed to parse database URL")?
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        })
        .busy_timeout(Duration::from_secs(config.connect_timeout_secs))
        .create_if_missing(true);

    // Each connection to an in-memory database is a separate database
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Build the repository selected by the database URL
pub async fn init_repository(config: &DatabaseConfig) -> Result<Arc<dyn Repository>> {
    if config.is_memory() {
        info!("Using in-memory repository");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    info!("Using SQLite repository");
    let pool = init_pool(config).await?;
    migrations::verify_tables(&pool).await?;
    Ok(Arc::new(SqliteRepository::new(pool)))
}

/// Check repository health
pub async fn check_health(repo: &dyn Repository) -> StoreResult<()> {
    repo.health_check().await
}

pub(crate) fn parse_db_timestamp(ts: &str) -> StoreResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    Err(StoreError::Unavailable(format!(
        "invalid stored timestamp: {}",
        ts
    )))
}

pub(crate) fn parse_optional_timestamp(ts: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    ts.as_deref().map(parse_db_timestamp).transpose()
}

/// Parse an enum column written with `as_str()`
pub(crate) fn parse_column<T>(column: &str, value: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| StoreError::Unavailable(format!("column {}: {}", column, e)))
}
