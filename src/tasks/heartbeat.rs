//! Per-exam heartbeat background task

use std::{sync::Weak, time::Duration};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::{TickOutcome, TimerEngine};

/// Periodically pushes the running exam's snapshot to its audience, and
/// drives expiry once remaining time reaches zero.
///
/// The first tick fires one period after the timer starts. The task ends as
/// soon as the engine reports the tick as expired or stale, or the engine is
/// dropped.
pub async fn heartbeat_task(engine: Weak<TimerEngine>, exam_id: String, generation: u64, period: Duration) {
    debug!(exam_id = %exam_id, generation, "Starting heartbeat task");

    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let Some(engine) = engine.upgrade() else {
            debug!(exam_id = %exam_id, "Engine dropped, stopping heartbeat");
            break;
        };

        match engine.tick(&exam_id, generation) {
            TickOutcome::Broadcast => {}
            TickOutcome::Expired => {
                info!(exam_id = %exam_id, "Heartbeat drove timer expiry");
                break;
            }
            TickOutcome::Stale => break,
        }
    }
}
