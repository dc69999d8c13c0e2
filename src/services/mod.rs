//! Business logic services layer

pub mod audit_service;
pub mod dispatcher;
pub mod tenant_directory;

pub use audit_service::AuditService;
pub use dispatcher::ActionDispatcher;
pub use tenant_directory::TenantDirectory;
