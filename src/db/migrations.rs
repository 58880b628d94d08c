//! Database migrations
//!
//! Migrations are handled by SQLx and stored in the `migrations/` directory.
//! This module checks the resulting schema after they ran.

use anyhow::{bail, Result};

use super::DbPool;

/// Tables the SQLite repository reads and writes
pub const REQUIRED_TABLES: [&str; 5] = [
    "institutions",
    "api_requests",
    "users",
    "notifications",
    "audit_log",
];

/// Fail if any table required by the repository is missing
pub async fn verify_tables(pool: &DbPool) -> Result<()> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    let missing: Vec<&str> = REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !present.iter().any(|p| p == table))
        .collect();

    if !missing.is_empty() {
        bail!("Database schema is missing tables: {}", missing.join(", "));
    }
    Ok(())
}
