//! In-process repository backend
//!
//! Each table is a `Vec` behind its own `RwLock`, so list results keep
//! insertion order. Compare-and-set status updates run under the table's
//! write lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AuditStore, InstitutionStore, NotificationStore, Repository, RequestStore, StoreError,
    StoreResult, UserStore,
};
use crate::models::{
    ApiRequest, AuditFilter, AuditLogEntry, Institution, InstitutionFilter, InstitutionPatch,
    InstitutionStatus, Notification, NotificationFilter, RequestFilter, RequestPatch,
    RequestStatus, User, UserFilter, UserPatch,
};

#[derive(Default)]
pub struct MemoryRepository {
    institutions: RwLock<Vec<Institution>>,
    requests: RwLock<Vec<ApiRequest>>,
    users: RwLock<Vec<User>>,
    notifications: RwLock<Vec<Notification>>,
    audit_log: RwLock<Vec<AuditLogEntry>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstitutionStore for MemoryRepository {
    async fn create_institution(&self, institution: Institution) -> StoreResult<Institution> {
        let mut table = self.institutions.write().await;
        if table.iter().any(|i| i.id == institution.id) {
            return Err(StoreError::Duplicate(format!(
                "institution {} already exists",
                institution.id
            )));
        }
        table.push(institution.clone());
        Ok(institution)
    }

    async fn get_institution(&self, id: &str) -> StoreResult<Option<Institution>> {
        let table = self.institutions.read().await;
        Ok(table.iter().find(|i| i.id == id).cloned())
    }

    async fn list_institutions(&self, filter: &InstitutionFilter) -> StoreResult<Vec<Institution>> {
        let table = self.institutions.read().await;
        Ok(table.iter().filter(|i| filter.matches(i)).cloned().collect())
    }

    async fn update_institution(
        &self,
        id: &str,
        patch: InstitutionPatch,
        expected_status: Option<InstitutionStatus>,
    ) -> StoreResult<Institution> {
        let mut table = self.institutions.write().await;
        let record = table
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::not_found("institution", id))?;

        if let Some(expected) = expected_status {
            if record.status != expected {
                return Err(StoreError::StatusConflict {
                    entity: "institution",
                    id: id.to_string(),
                    current: record.status.to_string(),
                });
            }
        }

        patch.apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl RequestStore for MemoryRepository {
    async fn create_request(&self, request: ApiRequest) -> StoreResult<ApiRequest> {
        let mut table = self.requests.write().await;
        if table.iter().any(|r| r.id == request.id) {
            return Err(StoreError::Duplicate(format!(
                "request {} already exists",
                request.id
            )));
        }
        table.push(request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: &str) -> StoreResult<Option<ApiRequest>> {
        let table = self.requests.read().await;
        Ok(table.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ApiRequest>> {
        let table = self.requests.read().await;
        Ok(table.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn update_request(
        &self,
        id: &str,
        patch: RequestPatch,
        expected_status: Option<RequestStatus>,
    ) -> StoreResult<ApiRequest> {
        let mut table = self.requests.write().await;
        let record = table
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("request", id))?;

        if let Some(expected) = expected_status {
            if record.status != expected {
                return Err(StoreError::StatusConflict {
                    entity: "request",
                    id: id.to_string(),
                    current: record.status.to_string(),
                });
            }
        }

        patch.apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl UserStore for MemoryRepository {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut table = self.users.write().await;
        if table
            .iter()
            .any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        table.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let table = self.users.read().await;
        Ok(table.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let table = self.users.read().await;
        Ok(table.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<User> {
        let mut table = self.users.write().await;
        let record = table
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        patch.apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl NotificationStore for MemoryRepository {
    async fn create_notification(&self, notification: Notification) -> StoreResult<Notification> {
        let mut table = self.notifications.write().await;
        table.push(notification.clone());
        Ok(notification)
    }

    async fn get_notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        let table = self.notifications.read().await;
        Ok(table.iter().find(|n| n.id == id).cloned())
    }

    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> StoreResult<Vec<Notification>> {
        let table = self.notifications.read().await;
        Ok(table.iter().filter(|n| filter.matches(n)).cloned().collect())
    }

    async fn set_notification_read(
        &self,
        id: &str,
        read: bool,
        read_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Notification> {
        let mut table = self.notifications.write().await;
        let record = table
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::not_found("notification", id))?;
        record.read = read;
        record.read_at = read_at;
        Ok(record.clone())
    }

    async fn mark_all_notifications_read(
        &self,
        user_id: &str,
        read_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut table = self.notifications.write().await;
        let mut changed = 0;
        for record in table.iter_mut().filter(|n| n.user_id == user_id && !n.read) {
            record.read = true;
            record.read_at = Some(read_at);
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl AuditStore for MemoryRepository {
    async fn append_audit(&self, entry: AuditLogEntry) -> StoreResult<AuditLogEntry> {
        let mut table = self.audit_log.write().await;
        table.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>> {
        let table = self.audit_log.read().await;
        Ok(table.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
