//! Authoritative per-exam countdown engine
//!
//! Each exam's state lives behind its own mutex. Every transition, the
//! heartbeat arming or cancelling that goes with it, and the resulting
//! broadcast happen inside that one critical section, so snapshots for an
//! exam leave in the same order the operations were applied.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    services::audience::Broadcaster,
    state::{TimerSnapshot, TimerState},
    tasks::heartbeat_task,
};

/// Result of one heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer still running, snapshot broadcast
    Broadcast,
    /// Remaining time reached zero, timer expired
    Expired,
    /// Tick belongs to a heartbeat that has since been cancelled
    Stale,
}

#[derive(Debug)]
struct Heartbeat {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct ExamTimer {
    state: TimerState,
    heartbeat: Option<Heartbeat>,
    generation: u64,
}

impl ExamTimer {
    fn cancel_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.handle.abort();
            debug!(
                exam_id = %self.state.exam_id,
                generation = heartbeat.generation,
                "Heartbeat cancelled"
            );
        }
    }
}

type Slot = Arc<Mutex<ExamTimer>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns every exam's countdown and drives its broadcasts
pub struct TimerEngine {
    timers: Mutex<HashMap<String, Slot>>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
    heartbeat_period: Duration,
    self_ref: Weak<TimerEngine>,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("exams", &lock(&self.timers).len())
            .field("heartbeat_period", &self.heartbeat_period)
            .finish()
    }
}

impl TimerEngine {
    pub fn new(
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
        heartbeat_period: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            timers: Mutex::new(HashMap::new()),
            broadcaster,
            clock,
            heartbeat_period,
            self_ref: self_ref.clone(),
        })
    }

    fn slot(&self, exam_id: &str, initial_duration_ms: Option<i64>) -> Slot {
        let mut timers = lock(&self.timers);
        let slot = timers.entry(exam_id.to_string()).or_insert_with(|| {
            debug!(exam_id = %exam_id, "Creating timer state");
            Arc::new(Mutex::new(ExamTimer {
                state: TimerState::new(exam_id, initial_duration_ms),
                heartbeat: None,
                generation: 0,
            }))
        });
        Arc::clone(slot)
    }

    fn broadcast(&self, timer: &ExamTimer, now_ms: i64) {
        self.broadcaster.broadcast_state(&timer.state.snapshot(now_ms));
    }

    /// Return the exam's state, creating a default one if none exists yet
    pub fn ensure(&self, exam_id: &str, initial_duration_ms: Option<i64>) -> TimerState {
        let slot = self.slot(exam_id, initial_duration_ms);
        let timer = lock(&slot);
        timer.state.clone()
    }

    /// Configure the duration of a timer that has never been touched.
    /// Already configured or used timers are left alone. Does not broadcast.
    pub fn initialize_if_default(&self, exam_id: &str, duration_ms: i64) {
        let slot = self.slot(exam_id, None);
        let mut timer = lock(&slot);
        if timer.state.is_untouched() {
            let duration_ms = duration_ms.max(0);
            timer.state.duration_ms = duration_ms;
            timer.state.paused_remaining_ms = duration_ms;
            debug!(exam_id = %exam_id, duration_ms, "Timer initialized");
        }
    }

    /// Start (or resume) the countdown.
    ///
    /// A non-negative `duration_ms` re-arms the clock first. Starting an
    /// already running timer changes nothing and does not broadcast.
    pub fn start(&self, exam_id: &str, duration_ms: Option<i64>) {
        let slot = self.slot(exam_id, duration_ms);
        let mut timer = lock(&slot);

        if let Some(duration_ms) = duration_ms.filter(|d| *d >= 0) {
            if timer.state.is_running() {
                debug!(exam_id = %exam_id, "Ignoring duration for running timer");
            } else {
                timer.state.duration_ms = duration_ms;
                timer.state.paused_remaining_ms = duration_ms;
            }
        }
        if timer.state.is_running() {
            debug!(exam_id = %exam_id, "Start ignored, timer already running");
            return;
        }

        let now_ms = self.clock.now_ms();
        timer.state.resume_at(now_ms);
        self.arm_heartbeat(exam_id, &mut timer);

        info!(
            exam_id = %exam_id,
            remaining_ms = timer.state.remaining_at(now_ms),
            "Timer started"
        );
        self.broadcast(&timer, now_ms);
    }

    /// Freeze the countdown at its current remaining time
    pub fn pause(&self, exam_id: &str) {
        let slot = self.slot(exam_id, None);
        let mut timer = lock(&slot);
        if !timer.state.is_running() {
            debug!(exam_id = %exam_id, "Pause ignored, timer not running");
            return;
        }

        let now_ms = self.clock.now_ms();
        timer.state.freeze_at(now_ms);
        timer.cancel_heartbeat();

        info!(
            exam_id = %exam_id,
            paused_remaining_ms = timer.state.paused_remaining_ms,
            "Timer paused"
        );
        self.broadcast(&timer, now_ms);
    }

    /// Stop the timer and restore its full duration, clearing every delta
    pub fn reset(&self, exam_id: &str, duration_ms: Option<i64>) {
        let slot = self.slot(exam_id, duration_ms);
        let mut timer = lock(&slot);

        if let Some(duration_ms) = duration_ms.filter(|d| *d >= 0) {
            timer.state.duration_ms = duration_ms;
        }
        timer.state.started_at_ms = None;
        timer.state.paused_remaining_ms = timer.state.duration_ms;
        timer.state.global_delta_ms = 0;
        timer.state.per_user_delta_ms.clear();
        timer.cancel_heartbeat();

        info!(exam_id = %exam_id, duration_ms = timer.state.duration_ms, "Timer reset");
        self.broadcast(&timer, self.clock.now_ms());
    }

    /// Add time globally, or for one viewer. Non-finite deltas are ignored.
    ///
    /// Driving a running timer to zero or below expires it.
    pub fn adjust(&self, exam_id: &str, delta_ms: f64, viewer_id: Option<&str>) {
        let slot = self.slot(exam_id, None);
        let mut timer = lock(&slot);

        let Some(delta_ms) = crate::state::millis_from_f64(delta_ms) else {
            warn!(exam_id = %exam_id, "Ignoring non-finite time adjustment");
            return;
        };
        timer.state.apply_delta(delta_ms, viewer_id);
        info!(exam_id = %exam_id, delta_ms, viewer_id = ?viewer_id, "Timer adjusted");

        let now_ms = self.clock.now_ms();
        if timer.state.is_running() && timer.state.remaining_at(now_ms) <= 0 {
            self.expire(&mut timer, now_ms);
            return;
        }
        self.broadcast(&timer, now_ms);
    }

    /// Global remaining time at `now_ms`; never negative
    pub fn remaining_at(&self, exam_id: &str, now_ms: i64) -> i64 {
        let slot = self.slot(exam_id, None);
        let timer = lock(&slot);
        timer.state.remaining_at(now_ms)
    }

    /// Public view of the exam's timer as of now
    pub fn snapshot(&self, exam_id: &str) -> TimerSnapshot {
        self.snapshot_with(exam_id, TimerSnapshot::clone)
    }

    /// Compute the current snapshot and hand it to `f` while the exam is
    /// still locked, so no concurrent broadcast can overtake what `f` sends.
    pub fn snapshot_with<R>(&self, exam_id: &str, f: impl FnOnce(&TimerSnapshot) -> R) -> R {
        let slot = self.slot(exam_id, None);
        let timer = lock(&slot);
        let snapshot = timer.state.snapshot(self.clock.now_ms());
        f(&snapshot)
    }

    pub fn is_heartbeat_armed(&self, exam_id: &str) -> bool {
        let slot = self.slot(exam_id, None);
        let timer = lock(&slot);
        timer.heartbeat.is_some()
    }

    /// One heartbeat tick for `exam_id`, issued by heartbeat `generation`
    pub fn tick(&self, exam_id: &str, generation: u64) -> TickOutcome {
        let slot = self.slot(exam_id, None);
        let mut timer = lock(&slot);

        let current = timer.heartbeat.as_ref().map(|hb| hb.generation);
        if !timer.state.is_running() || current != Some(generation) {
            debug!(exam_id = %exam_id, generation, "Discarding stale heartbeat tick");
            return TickOutcome::Stale;
        }

        let now_ms = self.clock.now_ms();
        if timer.state.remaining_at(now_ms) <= 0 {
            self.expire(&mut timer, now_ms);
            return TickOutcome::Expired;
        }
        self.broadcast(&timer, now_ms);
        TickOutcome::Broadcast
    }

    /// Running to not running at zero, followed by the one-time terminal
    /// signal. A timer that is already stopped is left untouched.
    fn expire(&self, timer: &mut ExamTimer, now_ms: i64) {
        if !timer.state.is_running() {
            return;
        }
        timer.state.mark_expired();
        timer.cancel_heartbeat();

        info!(exam_id = %timer.state.exam_id, "Timer expired");
        self.broadcast(timer, now_ms);
        self.broadcaster.broadcast_finished(&timer.state.exam_id);
    }

    fn arm_heartbeat(&self, exam_id: &str, timer: &mut ExamTimer) {
        timer.cancel_heartbeat();
        timer.generation += 1;
        let generation = timer.generation;

        let Ok(runtime) = Handle::try_current() else {
            warn!(exam_id = %exam_id, "No async runtime available, heartbeat not armed");
            return;
        };
        let handle = runtime.spawn(heartbeat_task(
            self.self_ref.clone(),
            exam_id.to_string(),
            generation,
            self.heartbeat_period,
        ));
        timer.heartbeat = Some(Heartbeat { generation, handle });
        debug!(exam_id = %exam_id, generation, "Heartbeat armed");
    }
}
