//! Access request model
//!
//! A request is a consumer institution's ask for access to a provider
//! institution's data API. It is created `pending` and decided exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request decision status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Only pending -> approved and pending -> rejected exist
    pub fn can_transition_to(&self, target: RequestStatus) -> bool {
        matches!(
            (self, target),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }

    pub fn all() -> [RequestStatus; 3] {
        [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ]
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

/// Request priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

pub const DEFAULT_RESPONSE_FORMAT: &str = "json";

/// Access request entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub purpose: String,
    pub consumer_id: String,
    pub provider_id: String,
    pub status: RequestStatus,
    pub priority: Priority,
    pub response_format: String,
    /// Requested field names, an ordered set
    pub attributes: Vec<String>,
    pub submitted_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ApiRequest {
    /// responseDate is set iff decided; rejectionReason iff rejected
    pub fn is_consistent(&self) -> bool {
        let decided = self.status.is_terminal();
        self.response_date.is_some() == decided
            && self.rejection_reason.is_some() == (self.status == RequestStatus::Rejected)
    }
}

/// Submission payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApiRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub purpose: String,
    #[serde(default)]
    pub consumer_id: String,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub response_format: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Acting user; the configured default actor is used when absent
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Status-change payload accepted by PATCH endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Partial update applied by the repository
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    pub response_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub api_endpoint: Option<String>,
}

impl RequestPatch {
    pub fn apply(&self, request: &mut ApiRequest) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(response_date) = self.response_date {
            request.response_date = Some(response_date);
        }
        if let Some(ref reason) = self.rejection_reason {
            request.rejection_reason = Some(reason.clone());
        }
        if let Some(ref endpoint) = self.api_endpoint {
            request.api_endpoint = Some(endpoint.clone());
        }
    }
}

/// Repository-level request filter
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub consumer_id: Option<String>,
    pub provider_id: Option<String>,
    pub priority: Option<Priority>,
}

impl RequestFilter {
    pub fn matches(&self, request: &ApiRequest) -> bool {
        self.status.is_none_or(|s| request.status == s)
            && self
                .consumer_id
                .as_ref()
                .is_none_or(|c| &request.consumer_id == c)
            && self
                .provider_id
                .as_ref()
                .is_none_or(|p| &request.provider_id == p)
            && self.priority.is_none_or(|p| request.priority == p)
    }
}

/// Request list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuery {
    pub status: Option<String>,
    pub consumer_id: Option<String>,
    pub provider_id: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
