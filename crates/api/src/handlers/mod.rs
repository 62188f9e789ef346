//! HTTP handlers, one module per resource.

pub mod template;
pub mod workflow;
