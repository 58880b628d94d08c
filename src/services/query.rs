//! Read-side façade
//!
//! Filtered listings and lookups over the repository plus the portal
//! statistics shown on the administrator dashboard. Nothing here writes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::Repository;
use crate::models::{
    parse_optional, ApiRequest, Institution, InstitutionFilter, InstitutionQuery,
    InstitutionStatus, ListResult, NotificationFilter, RequestFilter, RequestQuery,
    RequestStatus, User, UserFilter, UserQuery,
};
use crate::utils::{AppError, AppResult};

/// Counts shown on the portal dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortalStats {
    pub institutions: StatusCounts,
    pub requests: StatusCounts,
    pub users: usize,
    pub unread_notifications: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub by_status: HashMap<String, usize>,
}

impl StatusCounts {
    fn tally<'a>(statuses: impl Iterator<Item = &'a str>, known: &[&str]) -> Self {
        let mut by_status: HashMap<String, usize> =
            known.iter().map(|s| (s.to_string(), 0)).collect();
        let mut total = 0;
        for status in statuses {
            *by_status.entry(status.to_string()).or_insert(0) += 1;
            total += 1;
        }
        Self { total, by_status }
    }
}

#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn Repository>,
}

impl QueryService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn list_institutions(
        &self,
        query: &InstitutionQuery,
    ) -> AppResult<ListResult<Institution>> {
        let filter = InstitutionFilter {
            status: parse_optional("status", query.status.as_deref())?,
            organization_type: query
                .organization_type
                .clone()
                .filter(|t| !t.trim().is_empty()),
        };
        let institutions = self.repo.list_institutions(&filter).await?;
        Ok(ListResult::paginate(institutions, query.offset, query.limit))
    }

    pub async fn get_institution(&self, id: &str) -> AppResult<Institution> {
        self.repo
            .get_institution(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("institution {} not found", id)))
    }

    pub async fn list_requests(&self, query: &RequestQuery) -> AppResult<ListResult<ApiRequest>> {
        let filter = RequestFilter {
            status: parse_optional("status", query.status.as_deref())?,
            consumer_id: query.consumer_id.clone().filter(|c| !c.trim().is_empty()),
            provider_id: query.provider_id.clone().filter(|p| !p.trim().is_empty()),
            priority: parse_optional("priority", query.priority.as_deref())?,
        };
        let requests = self.repo.list_requests(&filter).await?;
        Ok(ListResult::paginate(requests, query.offset, query.limit))
    }

    pub async fn get_request(&self, id: &str) -> AppResult<ApiRequest> {
        self.repo
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("request {} not found", id)))
    }

    pub async fn list_users(&self, query: &UserQuery) -> AppResult<ListResult<User>> {
        let filter = UserFilter {
            role: parse_optional("role", query.role.as_deref())?,
            institution_id: query.institution_id.clone().filter(|i| !i.trim().is_empty()),
        };
        let users = self.repo.list_users(&filter).await?;
        Ok(ListResult::paginate(users, query.offset, query.limit))
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {} not found", id)))
    }

    pub async fn portal_stats(&self) -> AppResult<PortalStats> {
        let institutions = self
            .repo
            .list_institutions(&InstitutionFilter::default())
            .await?;
        let requests = self.repo.list_requests(&RequestFilter::default()).await?;
        let users = self.repo.list_users(&UserFilter::default()).await?;
        let unread = self
            .repo
            .list_notifications(&NotificationFilter {
                unread_only: true,
                ..Default::default()
            })
            .await?;

        let institution_states: Vec<&str> =
            InstitutionStatus::all().iter().map(|s| s.as_str()).collect();
        let request_states: Vec<&str> = RequestStatus::all().iter().map(|s| s.as_str()).collect();

        Ok(PortalStats {
            institutions: StatusCounts::tally(
                institutions.iter().map(|i| i.status.as_str()),
                &institution_states,
            ),
            requests: StatusCounts::tally(
                requests.iter().map(|r| r.status.as_str()),
                &request_states,
            ),
            users: users.len(),
            unread_notifications: unread.len(),
        })
    }
}
