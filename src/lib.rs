//! Exchange Portal Library
//!
//! Workflow core of an inter-institutional data-exchange portal: institution
//! registration, access request decisions, notifications and the audit trail.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use services::{AuditService, LifecycleService, NotificationService, QueryService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Storage backend selected by `database.url`
    pub repo: Arc<dyn Repository>,
    pub lifecycle: LifecycleService,
    pub notifications: NotificationService,
    pub audit: AuditService,
    pub query: QueryService,
}

impl AppState {
    /// Wire the services around a repository
    pub fn new(config: AppConfig, repo: Arc<dyn Repository>) -> Self {
        let audit = AuditService::new(repo.clone(), config.audit.default_limit);
        let notifications =
            NotificationService::new(repo.clone(), config.notifications.channel_capacity);
        let lifecycle = LifecycleService::new(
            repo.clone(),
            audit.clone(),
            notifications.clone(),
            config.audit.default_actor.clone(),
        );
        let query = QueryService::new(repo.clone());

        Self {
            config,
            repo,
            lifecycle,
            notifications,
            audit,
            query,
        }
    }
}
