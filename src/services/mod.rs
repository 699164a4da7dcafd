//! Core services module
//!
//! This module contains the timer engine, the audience hub that broadcasts
//! its snapshots, and the exam catalog.

pub mod audience;
pub mod catalog;
pub mod timer_engine;

// Re-export main types
pub use audience::{AudienceHub, Broadcaster, ConnectionId};
pub use catalog::{Exam, ExamCatalog};
pub use timer_engine::{TickOutcome, TimerEngine};
