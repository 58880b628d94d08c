//! Business logic services

pub mod audit;
pub mod lifecycle;
pub mod notification;
pub mod query;

pub use audit::AuditService;
pub use lifecycle::LifecycleService;
pub use notification::NotificationService;
pub use query::{PortalStats, QueryService, StatusCounts};
