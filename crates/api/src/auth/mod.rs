//! Authentication primitives.
//!
//! Tokens are issued by the company's identity service; this server only
//! validates them. [`jwt::generate_access_token`] exists for tooling and tests.

pub mod jwt;
