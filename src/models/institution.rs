//! Institution model
//!
//! An institution is an organization that can act as data provider and/or
//! consumer. Institutions register in `pending` state and are approved or
//! rejected by an administrator exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Institution registration status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstitutionStatus {
    #[default]
    Pending,
    #[serde(alias = "active")]
    Approved,
    #[serde(alias = "inactive")]
    Rejected,
}

impl InstitutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstitutionStatus::Pending => "pending",
            InstitutionStatus::Approved => "approved",
            InstitutionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InstitutionStatus::Pending)
    }

    /// Whether a status change from `self` to `target` is permitted.
    ///
    /// Only a pending institution can be decided; staying pending is allowed
    /// as a no-op.
    pub fn can_transition_to(&self, target: InstitutionStatus) -> bool {
        match (self, target) {
            (InstitutionStatus::Pending, _) => true,
            (InstitutionStatus::Approved | InstitutionStatus::Rejected, _) => false,
        }
    }

    pub fn all() -> [InstitutionStatus; 3] {
        [
            InstitutionStatus::Pending,
            InstitutionStatus::Approved,
            InstitutionStatus::Rejected,
        ]
    }
}

impl std::fmt::Display for InstitutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InstitutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(InstitutionStatus::Pending),
            "approved" | "active" => Ok(InstitutionStatus::Approved),
            "rejected" | "inactive" => Ok(InstitutionStatus::Rejected),
            _ => Err(format!("Invalid institution status: {}", s)),
        }
    }
}

/// Contact details of an institution's focal person
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[validate(length(min = 1, max = 200))]
    pub contact_person: String,
    #[validate(email)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Institution entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub organization_type: String,
    pub status: InstitutionStatus,
    pub contact: ContactInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    /// Set when an administrator approves or rejects the registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstitutionRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub organization_type: String,
    #[validate(nested)]
    pub contact: ContactInfo,
    #[serde(default)]
    #[validate(url)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    /// Acting user; the configured default actor is used when absent
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Profile edit payload (status is changed through the lifecycle, not here)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstitutionRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub organization_type: Option<String>,
    #[validate(nested)]
    pub contact: Option<ContactInfo>,
    #[validate(url)]
    pub api_endpoint: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Partial update applied by the repository; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstitutionPatch {
    pub name: Option<String>,
    pub organization_type: Option<String>,
    pub contact: Option<ContactInfo>,
    pub api_endpoint: Option<String>,
    pub description: Option<String>,
    pub status: Option<InstitutionStatus>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
}

impl From<UpdateInstitutionRequest> for InstitutionPatch {
    fn from(req: UpdateInstitutionRequest) -> Self {
        Self {
            name: req.name,
            organization_type: req.organization_type,
            contact: req.contact,
            api_endpoint: req.api_endpoint,
            description: req.description,
            ..Default::default()
        }
    }
}

impl InstitutionPatch {
    pub fn is_empty(&self) -> bool {
        *self == InstitutionPatch::default()
    }

    /// Apply the patch to a record in place
    pub fn apply(&self, institution: &mut Institution) {
        if let Some(ref name) = self.name {
            institution.name = name.clone();
        }
        if let Some(ref organization_type) = self.organization_type {
            institution.organization_type = organization_type.clone();
        }
        if let Some(ref contact) = self.contact {
            institution.contact = contact.clone();
        }
        if let Some(ref api_endpoint) = self.api_endpoint {
            institution.api_endpoint = Some(api_endpoint.clone());
        }
        if let Some(ref description) = self.description {
            institution.description = description.clone();
        }
        if let Some(status) = self.status {
            institution.status = status;
        }
        if let Some(reviewed_at) = self.reviewed_at {
            institution.reviewed_at = Some(reviewed_at);
        }
        if let Some(last_active) = self.last_active {
            institution.last_active = Some(last_active);
        }
    }
}

/// Repository-level institution filter
#[derive(Debug, Clone, Default)]
pub struct InstitutionFilter {
    pub status: Option<InstitutionStatus>,
    pub organization_type: Option<String>,
}

impl InstitutionFilter {
    pub fn matches(&self, institution: &Institution) -> bool {
        self.status.is_none_or(|s| institution.status == s)
            && self
                .organization_type
                .as_ref()
                .is_none_or(|t| institution.organization_type.eq_ignore_ascii_case(t))
    }
}

/// Institution list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionQuery {
    pub status: Option<String>,
    pub organization_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
