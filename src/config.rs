//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

/// Token accepted when none is configured; only suitable for local development
pub const DEV_ADMIN_TOKEN: &str = "dev-admin-token";

/// CLI argument parsing structure
#[derive(Debug, Clone, Parser)]
#[command(name = "exam-timer")]
#[command(about = "Authoritative exam countdown server with real-time viewer synchronization")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "PORT", default_value = "4000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Bearer token required for start, pause, reset and adjust
    #[arg(long, env = "EXAM_TIMER_ADMIN_TOKEN", default_value = DEV_ADMIN_TOKEN)]
    pub admin_token: String,

    /// Heartbeat period for running timers, in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub heartbeat_ms: u64,

    /// JSON file with the exam catalog (defaults to the built-in exams)
    #[arg(long)]
    pub exams: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn uses_dev_token(&self) -> bool {
        self.admin_token == DEV_ADMIN_TOKEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["exam-timer"]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.heartbeat_period(), Duration::from_secs(1));
        assert_eq!(config.log_level(), "info");
        assert!(config.exams.is_none());
    }

    #[test]
    fn explicit_arguments() {
        let config = Config::parse_from([
            "exam-timer",
            "--port",
            "8081",
            "--host",
            "127.0.0.1",
            "--admin-token",
            "s3cret",
            "--heartbeat-ms",
            "250",
            "-v",
        ]);
        assert_eq!(config.address(), "127.0.0.1:8081");
        assert_eq!(config.heartbeat_period(), Duration::from_millis(250));
        assert_eq!(config.log_level(), "debug");
        assert!(!config.uses_dev_token());
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        assert!(Config::try_parse_from(["exam-timer", "--heartbeat-ms", "0"]).is_err());
    }
}
