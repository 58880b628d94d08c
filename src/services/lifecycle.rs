//! Request and registration lifecycle
//!
//! The only place where institution and request statuses change. Every
//! operation validates and resolves references before its primary write, and
//! records audit entries and notifications strictly after it, so a rejected
//! or failed write leaves no trace.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::Repository;
use crate::models::{
    parse_optional, ApiRequest, AuditAction, EntityType, Institution, InstitutionPatch,
    InstitutionStatus, NotificationType, Priority, RegisterInstitutionRequest,
    RegisterUserRequest, RequestPatch, RequestStatus, SubmitApiRequest,
    UpdateInstitutionRequest, User, UserRole, DEFAULT_RESPONSE_FORMAT,
};
use crate::services::audit::{details, AuditService};
use crate::services::notification::NotificationService;
use crate::utils::validation::{
    actor_or_default, blank_as_none, normalize_attributes, require_non_blank,
};
use crate::utils::{AppError, AppResult};

/// Lifecycle manager for institutions, access requests and users
#[derive(Clone)]
pub struct LifecycleService {
    repo: Arc<dyn Repository>,
    audit: AuditService,
    notifications: NotificationService,
    default_actor: String,
}

impl LifecycleService {
    pub fn new(
        repo: Arc<dyn Repository>,
        audit: AuditService,
        notifications: NotificationService,
        default_actor: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            audit,
            notifications,
            default_actor: default_actor.into(),
        }
    }

    fn actor(&self, actor: Option<&str>) -> String {
        actor_or_default(actor, &self.default_actor)
    }

    async fn load_institution(&self, id: &str) -> AppResult<Institution> {
        self.repo
            .get_institution(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("institution {} not found", id)))
    }

    async fn load_request(&self, id: &str) -> AppResult<ApiRequest> {
        self.repo
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("request {} not found", id)))
    }

    /// Resolve an institution referenced from a request payload
    async fn referenced_institution(&self, field: &str, id: &str) -> AppResult<Institution> {
        self.repo.get_institution(id).await?.ok_or_else(|| {
            AppError::validation(format!("{} {} does not reference an institution", field, id))
        })
    }

    // ------------------------------------------------------------------
    // Institutions
    // ------------------------------------------------------------------

    /// Register a new institution in `pending` state
    pub async fn register_institution(
        &self,
        mut req: RegisterInstitutionRequest,
    ) -> AppResult<Institution> {
        req.api_endpoint = blank_as_none(req.api_endpoint);
        let name = require_non_blank("name", Some(&req.name))?;
        let organization_type = require_non_blank("organizationType", Some(&req.organization_type))?;
        require_non_blank("contact.email", Some(&req.contact.email))?;
        req.validate()?;
        let actor = self.actor(req.user_id.as_deref());

        let institution = Institution {
            id: Uuid::new_v4().to_string(),
            name,
            organization_type,
            status: InstitutionStatus::Pending,
            contact: req.contact,
            api_endpoint: req.api_endpoint,
            description: req.description,
            created_at: Utc::now(),
            last_active: None,
            reviewed_at: None,
        };

        let institution = self.repo.create_institution(institution).await?;

        self.audit
            .record(
                &actor,
                AuditAction::CreateInstitution,
                EntityType::Institution,
                &institution.id,
                details([
                    ("name", institution.name.as_str()),
                    ("organizationType", institution.organization_type.as_str()),
                ]),
            )
            .await?;

        info!(
            institution_id = %institution.id,
            actor = %actor,
            "Registered institution {}",
            institution.name
        );
        Ok(institution)
    }

    /// Approve or reject a pending institution.
    ///
    /// Asking for `pending` while the institution is pending changes nothing
    /// and records nothing.
    pub async fn update_institution_status(
        &self,
        id: &str,
        target: InstitutionStatus,
        actor: Option<&str>,
    ) -> AppResult<Institution> {
        let current = self.load_institution(id).await?;

        if current.status == InstitutionStatus::Pending && target == InstitutionStatus::Pending {
            return Ok(current);
        }
        if !current.status.can_transition_to(target) {
            return Err(AppError::invalid_transition(format!(
                "institution {} is already {}",
                id, current.status
            )));
        }

        let actor = self.actor(actor);
        let patch = InstitutionPatch {
            status: Some(target),
            reviewed_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self
            .repo
            .update_institution(id, patch, Some(current.status))
            .await?;

        let approved = target == InstitutionStatus::Approved;
        let action = if approved {
            AuditAction::ApproveInstitution
        } else {
            AuditAction::RejectInstitution
        };
        self.audit
            .record(
                &actor,
                action,
                EntityType::Institution,
                id,
                details([
                    ("previousStatus", current.status.as_str()),
                    ("status", updated.status.as_str()),
                    ("name", updated.name.as_str()),
                ]),
            )
            .await?;

        self.notifications
            .notify_institution_approval(id, &updated.name, approved)
            .await?;

        info!(
            institution_id = %id,
            actor = %actor,
            status = %updated.status,
            "Institution decided"
        );
        Ok(updated)
    }

    /// Edit an institution's profile fields; status is untouched
    pub async fn update_institution_profile(
        &self,
        id: &str,
        mut req: UpdateInstitutionRequest,
    ) -> AppResult<Institution> {
        req.api_endpoint = blank_as_none(req.api_endpoint);
        req.validate()?;
        let actor = self.actor(req.user_id.as_deref());
        let patch = InstitutionPatch::from(req);
        if patch.is_empty() {
            return Err(AppError::validation("no profile fields to update"));
        }

        let changed: Vec<&str> = [
            ("name", patch.name.is_some()),
            ("organizationType", patch.organization_type.is_some()),
            ("contact", patch.contact.is_some()),
            ("apiEndpoint", patch.api_endpoint.is_some()),
            ("description", patch.description.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect();

        let updated = self.repo.update_institution(id, patch, None).await?;

        self.audit
            .record(
                &actor,
                AuditAction::UpdateInstitution,
                EntityType::Institution,
                id,
                details([("fields", json!(changed))]),
            )
            .await?;

        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Access requests
    // ------------------------------------------------------------------

    /// Submit a new access request in `pending` state
    pub async fn submit_request(&self, req: SubmitApiRequest) -> AppResult<ApiRequest> {
        let title = require_non_blank("title", Some(&req.title))?;
        let consumer_id = require_non_blank("consumerId", Some(&req.consumer_id))?;
        let provider_id = require_non_blank("providerId", Some(&req.provider_id))?;
        if consumer_id == provider_id {
            return Err(AppError::validation(
                "consumerId and providerId must reference different institutions",
            ));
        }
        req.validate()?;
        let priority = parse_optional::<Priority>("priority", req.priority.as_deref())?
            .unwrap_or_default();
        let response_format = req
            .response_format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_RESPONSE_FORMAT)
            .to_string();
        let attributes = normalize_attributes(req.attributes)?;
        let actor = self.actor(req.user_id.as_deref());

        let consumer = self.referenced_institution("consumerId", &consumer_id).await?;
        self.referenced_institution("providerId", &provider_id).await?;

        let request = ApiRequest {
            id: Uuid::new_v4().to_string(),
            title,
            description: req.description,
            purpose: req.purpose,
            consumer_id,
            provider_id,
            status: RequestStatus::Pending,
            priority,
            response_format,
            attributes,
            submitted_date: Utc::now(),
            response_date: None,
            api_endpoint: None,
            rejection_reason: None,
        };

        let request = self.repo.create_request(request).await?;

        self.audit
            .record(
                &actor,
                AuditAction::CreateRequest,
                EntityType::Request,
                &request.id,
                details([
                    ("title", json!(request.title)),
                    ("consumerId", json!(request.consumer_id)),
                    ("providerId", json!(request.provider_id)),
                    ("priority", json!(request.priority.as_str())),
                ]),
            )
            .await?;

        self.notifications
            .notify_institution(
                &request.provider_id,
                "New access request",
                &format!("{} requested access: {}", consumer.name, request.title),
                NotificationType::Info,
                Some(json!({ "requestId": request.id, "consumerId": request.consumer_id })),
            )
            .await?;

        info!(request_id = %request.id, actor = %actor, "Submitted access request");
        Ok(request)
    }

    /// Approve a pending request
    pub async fn approve_request(&self, id: &str, actor: Option<&str>) -> AppResult<ApiRequest> {
        let current = self.load_request(id).await?;
        if !current.status.can_transition_to(RequestStatus::Approved) {
            return Err(AppError::invalid_transition(format!(
                "request {} is already {}",
                id, current.status
            )));
        }
        let actor = self.actor(actor);

        // The consumer is pointed at the provider's published endpoint
        let api_endpoint = self
            .repo
            .get_institution(&current.provider_id)
            .await?
            .and_then(|provider| provider.api_endpoint);

        let patch = RequestPatch {
            status: Some(RequestStatus::Approved),
            response_date: Some(Utc::now()),
            rejection_reason: None,
            api_endpoint,
        };
        let updated = self
            .repo
            .update_request(id, patch, Some(RequestStatus::Pending))
            .await?;

        self.audit
            .record(
                &actor,
                AuditAction::ApproveRequest,
                EntityType::Request,
                id,
                details([
                    ("title", updated.title.as_str()),
                    ("consumerId", updated.consumer_id.as_str()),
                    ("providerId", updated.provider_id.as_str()),
                ]),
            )
            .await?;

        self.notifications
            .notify_institution(
                &updated.consumer_id,
                "Access request approved",
                &format!("Your request \"{}\" has been approved.", updated.title),
                NotificationType::Success,
                Some(json!({ "requestId": updated.id, "apiEndpoint": updated.api_endpoint })),
            )
            .await?;

        info!(request_id = %id, actor = %actor, "Approved access request");
        Ok(updated)
    }

    /// Reject a pending request; a non-blank reason is required
    pub async fn reject_request(
        &self,
        id: &str,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> AppResult<ApiRequest> {
        let reason = require_non_blank("reason", reason)?;

        let current = self.load_request(id).await?;
        if !current.status.can_transition_to(RequestStatus::Rejected) {
            return Err(AppError::invalid_transition(format!(
                "request {} is already {}",
                id, current.status
            )));
        }
        let actor = self.actor(actor);

        let patch = RequestPatch {
            status: Some(RequestStatus::Rejected),
            response_date: Some(Utc::now()),
            rejection_reason: Some(reason.clone()),
            api_endpoint: None,
        };
        let updated = self
            .repo
            .update_request(id, patch, Some(RequestStatus::Pending))
            .await?;

        self.audit
            .record(
                &actor,
                AuditAction::RejectRequest,
                EntityType::Request,
                id,
                details([
                    ("title", updated.title.as_str()),
                    ("reason", reason.as_str()),
                ]),
            )
            .await?;

        self.notifications
            .notify_institution(
                &updated.consumer_id,
                "Access request rejected",
                &format!("Your request \"{}\" was rejected: {}", updated.title, reason),
                NotificationType::Error,
                Some(json!({ "requestId": updated.id, "reason": reason })),
            )
            .await?;

        info!(request_id = %id, actor = %actor, "Rejected access request");
        Ok(updated)
    }

    /// Move a request to `target`; the entry point for status PATCHes
    pub async fn update_request_status(
        &self,
        id: &str,
        target: RequestStatus,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> AppResult<ApiRequest> {
        match target {
            RequestStatus::Approved => self.approve_request(id, actor).await,
            RequestStatus::Rejected => self.reject_request(id, actor, reason).await,
            RequestStatus::Pending => {
                let current = self.load_request(id).await?;
                warn!(request_id = %id, "Refused move back to pending");
                Err(AppError::invalid_transition(format!(
                    "request {} is {} and cannot return to pending",
                    id, current.status
                )))
            }
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn register_user(&self, req: RegisterUserRequest) -> AppResult<User> {
        let name = require_non_blank("name", Some(&req.name))?;
        let role_value = require_non_blank("role", Some(&req.role))?;
        req.validate()?;
        let role: UserRole = role_value
            .parse()
            .map_err(|e: String| AppError::validation(format!("role: {}", e)))?;
        let actor = self.actor(req.user_id.as_deref());

        let institution_id = match req.institution_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                self.referenced_institution("institutionId", id).await?;
                Some(id.to_string())
            }
            _ => None,
        };

        let user = User {
            id: Uuid::new_v4().to_string(),
            name,
            email: req.email.trim().to_string(),
            role,
            institution_id,
            created_at: Utc::now(),
            last_login: None,
        };
        let user = self.repo.create_user(user).await?;

        self.audit
            .record(
                &actor,
                AuditAction::CreateUser,
                EntityType::User,
                &user.id,
                details([("email", user.email.as_str()), ("role", user.role.as_str())]),
            )
            .await?;

        info!(user_id = %user.id, role = %user.role, "Registered user");
        Ok(user)
    }
}
