//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod heartbeat;

// Re-export main functions
pub use heartbeat::heartbeat_task;
