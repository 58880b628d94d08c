//! Audit log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key/value details attached to an audit entry
pub type AuditDetails = serde_json::Map<String, serde_json::Value>;

/// Audited action, verb + entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateInstitution,
    UpdateInstitution,
    ApproveInstitution,
    RejectInstitution,
    CreateRequest,
    ApproveRequest,
    RejectRequest,
    CreateUser,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateInstitution => "CREATE_INSTITUTION",
            AuditAction::UpdateInstitution => "UPDATE_INSTITUTION",
            AuditAction::ApproveInstitution => "APPROVE_INSTITUTION",
            AuditAction::RejectInstitution => "REJECT_INSTITUTION",
            AuditAction::CreateRequest => "CREATE_REQUEST",
            AuditAction::ApproveRequest => "APPROVE_REQUEST",
            AuditAction::RejectRequest => "REJECT_REQUEST",
            AuditAction::CreateUser => "CREATE_USER",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE_INSTITUTION" => Ok(AuditAction::CreateInstitution),
            "UPDATE_INSTITUTION" => Ok(AuditAction::UpdateInstitution),
            "APPROVE_INSTITUTION" => Ok(AuditAction::ApproveInstitution),
            "REJECT_INSTITUTION" => Ok(AuditAction::RejectInstitution),
            "CREATE_REQUEST" => Ok(AuditAction::CreateRequest),
            "APPROVE_REQUEST" => Ok(AuditAction::ApproveRequest),
            "REJECT_REQUEST" => Ok(AuditAction::RejectRequest),
            "CREATE_USER" => Ok(AuditAction::CreateUser),
            _ => Err(format!("Invalid audit action: {}", s)),
        }
    }
}

/// Kind of entity an audit entry refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Institution,
    Request,
    User,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Institution => "institution",
            EntityType::Request => "request",
            EntityType::User => "user",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "institution" => Ok(EntityType::Institution),
            "request" => Ok(EntityType::Request),
            "user" => Ok(EntityType::User),
            _ => Err(format!("Invalid entity type: {}", s)),
        }
    }
}

/// Immutable audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    /// Acting user, `system` when no actor was supplied
    pub user_id: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub details: AuditDetails,
    pub timestamp: DateTime<Utc>,
}

/// Repository-level audit filter
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id.as_ref().is_none_or(|u| &entry.user_id == u)
            && self.entity_type.is_none_or(|t| entry.entity_type == t)
            && self
                .entity_id
                .as_ref()
                .is_none_or(|id| &entry.entity_id == id)
            && self.action.is_none_or(|a| entry.action == a)
    }
}

/// Result ordering for audit queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first
    #[default]
    Desc,
    /// Chronological
    Asc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desc" => Ok(SortOrder::Desc),
            "asc" => Ok(SortOrder::Asc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Audit log query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub user_id: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<String>,
    pub order: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
