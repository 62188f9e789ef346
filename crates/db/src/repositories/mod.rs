//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod org_repo;
pub mod workflow_instance_repo;
pub mod workflow_template_repo;

pub use audit_repo::AuditLogRepo;
pub use org_repo::OrgRepo;
pub use workflow_instance_repo::WorkflowInstanceRepo;
pub use workflow_template_repo::WorkflowTemplateRepo;
