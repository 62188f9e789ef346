//! Notification delivery channels.

pub mod log;
pub mod webhook;
