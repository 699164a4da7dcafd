//! Exam Timer - authoritative exam countdowns with real-time viewer sync
//!
//! One countdown per exam is kept in absolute wall-clock terms by the
//! [`TimerEngine`]. Every change, and a fixed heartbeat while running, is
//! pushed to the exam's audience of connected viewers, who rebuild the
//! remaining time from the snapshot's server timestamp and their own clock.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod protocol;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use services::{AudienceHub, Broadcaster, TimerEngine};
pub use state::{AppState, TimerSnapshot, TimerState};
pub use utils::signals::shutdown_signal;
