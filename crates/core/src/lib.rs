//! Domain core for the HR workflow platform.
//!
//! Everything in this crate is free of I/O: the workflow engine computes new
//! instance states plus the side-effect intents the caller must dispatch, and
//! the storage/notification contracts it relies on are expressed as traits.

pub mod audit;
pub mod domain;
pub mod error;
pub mod roles;
pub mod types;
pub mod workflow;
