//! Row types for the workflow, audit and organisation tables.

pub mod audit;
pub mod org;
pub mod workflow;
