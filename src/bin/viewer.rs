//! Terminal viewer for an exam countdown
//!
//! Joins an exam over the push channel and redraws the remaining time
//! locally between server snapshots.

use std::{io::Write, time::Duration};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

use exam_timer::{
    protocol::{ClientMessage, JoinExam, ServerMessage},
    TimerSnapshot,
};

#[derive(Parser)]
#[command(name = "exam-timer-viewer")]
#[command(about = "Watch an exam countdown from the terminal")]
struct Args {
    /// Push channel URL
    #[arg(long, default_value = "ws://127.0.0.1:4000/ws")]
    url: String,

    /// Exam to watch
    #[arg(short, long)]
    exam: String,

    /// Viewer id, for per-viewer time adjustments
    #[arg(short, long)]
    user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn format_ms(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn render(snapshot: Option<&TimerSnapshot>, user: Option<&str>) {
    let line = match snapshot {
        Some(snapshot) => {
            let remaining = snapshot.viewer_remaining_ms(user, Utc::now().timestamp_millis());
            let status = if snapshot.running { "running" } else { "paused" };
            format!("{}  {}", format_ms(remaining), status)
        }
        None => "waiting for server...".to_string(),
    };
    print!("\r{:<32}", line);
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose { "debug" } else { "warn" })
        .init();

    let (ws, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    let (mut sink, mut stream) = ws.split();

    let join = ClientMessage::JoinExam(JoinExam {
        exam_id: args.exam.clone(),
        user_id: args.user.clone(),
    });
    sink.send(Message::Text(serde_json::to_string(&join)?)).await?;
    info!("Joined exam {}", args.exam);

    let mut latest: Option<TimerSnapshot> = None;
    let mut redraw = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = redraw.tick() => render(latest.as_ref(), args.user.as_deref()),
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        println!();
                        warn!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::TimerState(snapshot)) if snapshot.exam_id == args.exam => {
                        latest = Some(snapshot);
                        render(latest.as_ref(), args.user.as_deref());
                    }
                    Ok(ServerMessage::TimerFinished(finished)) if finished.exam_id == args.exam => {
                        if let Some(snapshot) = latest.as_mut() {
                            snapshot.running = false;
                            snapshot.remaining_ms = 0;
                        }
                        render(latest.as_ref(), args.user.as_deref());
                        println!("\nTime is up.");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Ignoring unexpected frame: {}", e),
                }
            }
        }
    }

    Ok(())
}
