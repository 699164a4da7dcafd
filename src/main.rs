//! Exam Timer - authoritative exam countdown server
//!
//! This is the main entry point for the exam-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use exam_timer::{api::create_router, config::Config, state::AppState, utils::shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("exam_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting exam-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, heartbeat={}ms",
        config.host, config.port, config.heartbeat_ms
    );

    let state = Arc::new(AppState::new(&config)?);
    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /exams                          - List exams");
    info!("  GET  /exams/:exam_id/timer           - Current timer snapshot");
    info!("  POST /exams/:exam_id/timer/start     - Start or resume (admin)");
    info!("  POST /exams/:exam_id/timer/pause     - Pause (admin)");
    info!("  POST /exams/:exam_id/timer/reset     - Reset (admin)");
    info!("  POST /exams/:exam_id/timer/adjust    - Adjust time (admin)");
    info!("  GET  /ws                             - Viewer push channel");
    info!("  GET  /health                         - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
