//! Audit trail recorder

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::db::Repository;
use crate::models::{
    parse_optional, AuditAction, AuditDetails, AuditFilter, AuditLogEntry, AuditLogQuery,
    EntityType, ListResult, SortOrder,
};
use crate::utils::AppResult;

/// Appends and queries the immutable audit trail
#[derive(Clone)]
pub struct AuditService {
    repo: Arc<dyn Repository>,
    default_limit: usize,
}

impl AuditService {
    pub fn new(repo: Arc<dyn Repository>, default_limit: usize) -> Self {
        Self {
            repo,
            default_limit,
        }
    }

    /// Append an entry with a fresh id and the current time
    pub async fn record(
        &self,
        actor: &str,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: &str,
        details: AuditDetails,
    ) -> AppResult<AuditLogEntry> {
        let entry = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: actor.to_string(),
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            details,
            timestamp: Utc::now(),
        };

        let entry = self.repo.append_audit(entry).await?;
        debug!(
            actor = %entry.user_id,
            action = %entry.action,
            entity_id = %entry.entity_id,
            "Recorded audit entry"
        );
        Ok(entry)
    }

    /// Filtered, ordered and paginated view of the trail
    pub async fn list(&self, query: &AuditLogQuery) -> AppResult<ListResult<AuditLogEntry>> {
        let filter = AuditFilter {
            user_id: query.user_id.clone().filter(|u| !u.trim().is_empty()),
            entity_type: parse_optional::<EntityType>("entityType", query.entity_type.as_deref())?,
            entity_id: query.entity_id.clone().filter(|e| !e.trim().is_empty()),
            action: parse_optional::<AuditAction>("action", query.action.as_deref())?,
        };
        let order = parse_optional::<SortOrder>("order", query.order.as_deref())?.unwrap_or_default();

        let mut entries = self.repo.list_audit(&filter).await?;
        if order == SortOrder::Desc {
            entries.reverse();
        }

        Ok(ListResult::paginate(
            entries,
            query.offset,
            Some(query.limit.unwrap_or(self.default_limit)),
        ))
    }
}

/// Build audit details from `(key, value)` pairs
pub fn details<I, K, V>(pairs: I) -> AuditDetails
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
