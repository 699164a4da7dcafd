//! Main application state

use std::{sync::Arc, time::Instant};

use tracing::{info, warn};

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    services::{AudienceHub, ExamCatalog, TimerEngine},
};

/// Shared state handed to every HTTP and WebSocket handler
#[derive(Debug)]
pub struct AppState {
    /// Authoritative timers for every exam
    pub engine: Arc<TimerEngine>,
    /// Live viewer connections grouped by exam
    pub audiences: Arc<AudienceHub>,
    pub catalog: ExamCatalog,
    admin_token: String,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    /// Build the application state on the system clock
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the application state on an arbitrary clock
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let catalog = match &config.exams {
            Some(path) => ExamCatalog::from_file(path)?,
            None => ExamCatalog::default(),
        };
        if config.uses_dev_token() {
            warn!("Using the development admin token; set EXAM_TIMER_ADMIN_TOKEN in production");
        }

        let audiences = Arc::new(AudienceHub::new());
        let engine = TimerEngine::new(audiences.clone(), clock, config.heartbeat_period());
        info!(
            "Application state ready: {} exams, heartbeat every {}ms",
            catalog.all().len(),
            config.heartbeat_ms
        );

        Ok(Self {
            engine,
            audiences,
            catalog,
            admin_token: config.admin_token.clone(),
            start_time: Instant::now(),
            port: config.port,
            host: config.host.clone(),
        })
    }

    /// Whether `token` grants privileged timer control
    pub fn is_admin_token(&self, token: &str) -> bool {
        !token.is_empty() && token == self.admin_token
    }

    /// Seed an exam's timer from the catalog if it has never been configured
    pub fn initialize_from_catalog(&self, exam_id: &str) {
        if let Some(duration_ms) = self.catalog.duration_of(exam_id) {
            self.engine.initialize_if_default(exam_id, duration_ms);
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
