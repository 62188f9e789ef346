//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller, from a JWT Bearer token.
//! - [`rbac::RequireHrAdmin`] -- requires `hr_admin` or `admin`.

pub mod auth;
pub mod rbac;
