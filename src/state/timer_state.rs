//! Timer state structure and remaining-time arithmetic

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Authoritative countdown state for one exam
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub exam_id: String,
    /// Configured total duration, never negative
    pub duration_ms: i64,
    /// Start of the current running interval; `None` while not running
    pub started_at_ms: Option<i64>,
    /// Remaining time captured at the last pause, reset, or initialization
    pub paused_remaining_ms: i64,
    pub global_delta_ms: i64,
    pub per_user_delta_ms: HashMap<String, i64>,
}

impl TimerState {
    /// Create a fresh, not running timer, optionally seeded with a duration
    pub fn new(exam_id: impl Into<String>, initial_duration_ms: Option<i64>) -> Self {
        let base = initial_duration_ms.unwrap_or(0).max(0);
        Self {
            exam_id: exam_id.into(),
            duration_ms: base,
            started_at_ms: None,
            paused_remaining_ms: base,
            global_delta_ms: 0,
            per_user_delta_ms: HashMap::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// True while the timer has never been configured nor used
    pub fn is_untouched(&self) -> bool {
        !self.is_running()
            && self.duration_ms == 0
            && self.paused_remaining_ms == 0
            && self.global_delta_ms == 0
            && self.per_user_delta_ms.is_empty()
    }

    /// Global remaining time at `now_ms`, clamped to zero
    pub fn remaining_at(&self, now_ms: i64) -> i64 {
        let remaining = match self.started_at_ms {
            Some(started_at_ms) => self
                .duration_ms
                .saturating_add(self.global_delta_ms)
                .saturating_sub(now_ms.saturating_sub(started_at_ms)),
            None => self.paused_remaining_ms.saturating_add(self.global_delta_ms),
        };
        remaining.max(0)
    }

    /// Begin a running interval at `now_ms`, continuing from the paused
    /// remaining time. `started_at_ms` is backdated by whatever part of the
    /// duration was already consumed.
    pub fn resume_at(&mut self, now_ms: i64) {
        let consumed = self.duration_ms.saturating_sub(self.paused_remaining_ms);
        self.started_at_ms = Some(now_ms.saturating_sub(consumed));
    }

    /// End the running interval at `now_ms`, keeping what is left.
    /// The stored value excludes the global delta, which is added back on read.
    pub fn freeze_at(&mut self, now_ms: i64) {
        if let Some(started_at_ms) = self.started_at_ms.take() {
            self.paused_remaining_ms = self
                .duration_ms
                .saturating_sub(now_ms.saturating_sub(started_at_ms));
        }
    }

    /// Stop at exactly zero remaining, whatever the global delta
    pub fn mark_expired(&mut self) {
        self.started_at_ms = None;
        self.paused_remaining_ms = 0i64.saturating_sub(self.global_delta_ms.max(0));
    }

    /// Add to the global delta, or to one viewer's delta
    pub fn apply_delta(&mut self, delta_ms: i64, viewer_id: Option<&str>) {
        match viewer_id {
            Some(viewer_id) => {
                let entry = self.per_user_delta_ms.entry(viewer_id.to_string()).or_insert(0);
                *entry = entry.saturating_add(delta_ms);
            }
            None => self.global_delta_ms = self.global_delta_ms.saturating_add(delta_ms),
        }
    }

    /// Public view of this state as seen at `server_now_ms`
    pub fn snapshot(&self, server_now_ms: i64) -> TimerSnapshot {
        TimerSnapshot {
            exam_id: self.exam_id.clone(),
            running: self.is_running(),
            duration_ms: self.duration_ms,
            started_at_ms: self.started_at_ms,
            paused_remaining_ms: self.paused_remaining_ms,
            global_delta_ms: self.global_delta_ms,
            per_user_delta_ms: self
                .per_user_delta_ms
                .iter()
                .map(|(viewer, delta)| (viewer.clone(), *delta))
                .collect(),
            server_now_ms,
            remaining_ms: self.remaining_at(server_now_ms),
        }
    }
}

/// Immutable public view of a timer, as pushed to viewers.
///
/// Field names are a compatibility contract with every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub exam_id: String,
    pub running: bool,
    pub duration_ms: i64,
    pub started_at_ms: Option<i64>,
    pub paused_remaining_ms: i64,
    pub global_delta_ms: i64,
    pub per_user_delta_ms: BTreeMap<String, i64>,
    pub server_now_ms: i64,
    /// Global remaining time at `server_now_ms`, before any viewer delta
    pub remaining_ms: i64,
}

impl TimerSnapshot {
    pub fn viewer_delta_ms(&self, viewer_id: Option<&str>) -> i64 {
        viewer_id
            .and_then(|viewer| self.per_user_delta_ms.get(viewer))
            .copied()
            .unwrap_or(0)
    }

    /// Remaining time a viewer should display at its own `local_now_ms`.
    ///
    /// Corrects for the gap between the viewer's clock and `server_now_ms`
    /// while running; a stopped timer shows its base value unchanged.
    pub fn viewer_remaining_ms(&self, viewer_id: Option<&str>, local_now_ms: i64) -> i64 {
        let base_remaining = self.remaining_ms.saturating_add(self.viewer_delta_ms(viewer_id));
        if !self.running {
            return base_remaining.max(0);
        }
        let drift = local_now_ms.saturating_sub(self.server_now_ms);
        base_remaining.saturating_sub(drift).max(0)
    }
}

/// Convert a JSON millisecond value to an integer, rejecting NaN and infinities
pub fn millis_from_f64(value: f64) -> Option<i64> {
    // `as` saturates at the i64 bounds
    value.is_finite().then(|| value.round() as i64)
}
