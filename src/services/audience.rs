//! Broadcast coordination: per-exam audiences of live viewer connections

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{protocol::ServerMessage, state::TimerSnapshot};

/// Delivery side of the timer engine
pub trait Broadcaster: Send + Sync {
    /// Push a snapshot to everyone watching `snapshot.exam_id`
    fn broadcast_state(&self, snapshot: &TimerSnapshot);
    /// Push the terminal signal for an exam
    fn broadcast_finished(&self, exam_id: &str);
}

/// Identifier of one live viewer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug)]
struct Connection {
    sender: mpsc::UnboundedSender<ServerMessage>,
    exam_id: Option<String>,
    viewer_id: Option<String>,
}

#[derive(Debug, Default)]
struct HubInner {
    connections: HashMap<ConnectionId, Connection>,
    audiences: HashMap<String, HashSet<ConnectionId>>,
}

impl HubInner {
    fn leave_current(&mut self, id: ConnectionId) -> Option<String> {
        let exam_id = self.connections.get_mut(&id)?.exam_id.take()?;
        if let Some(audience) = self.audiences.get_mut(&exam_id) {
            audience.remove(&id);
            if audience.is_empty() {
                self.audiences.remove(&exam_id);
            }
        }
        Some(exam_id)
    }

    fn send_to_audience(&self, exam_id: &str, message: &ServerMessage) -> usize {
        let Some(audience) = self.audiences.get(exam_id) else {
            return 0;
        };
        audience
            .iter()
            .filter_map(|id| self.connections.get(id))
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }
}

/// Audience membership for every exam plus the outbound channel of every
/// connected viewer. A connection is in at most one audience at a time.
#[derive(Debug, Default)]
pub struct AudienceHub {
    inner: Mutex<HubInner>,
    next_id: AtomicU64,
}

impl AudienceHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a new connection that is not yet watching any exam
    pub fn register(&self, sender: mpsc::UnboundedSender<ServerMessage>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().connections.insert(
            id,
            Connection {
                sender,
                exam_id: None,
                viewer_id: None,
            },
        );
        debug!("Registered viewer connection {}", id);
        id
    }

    /// Move a connection into the audience of `snapshot.exam_id` and send it
    /// that snapshot privately. Returns false for an unknown connection.
    pub fn join(&self, id: ConnectionId, viewer_id: Option<String>, snapshot: &TimerSnapshot) -> bool {
        let mut inner = self.lock();
        if !inner.connections.contains_key(&id) {
            return false;
        }

        if let Some(previous) = inner.leave_current(id) {
            debug!("Connection {} left audience of {}", id, previous);
        }

        let exam_id = snapshot.exam_id.clone();
        inner.audiences.entry(exam_id.clone()).or_default().insert(id);

        let Some(conn) = inner.connections.get_mut(&id) else {
            return false;
        };
        conn.exam_id = Some(exam_id.clone());
        conn.viewer_id = viewer_id;
        let _ = conn.sender.send(ServerMessage::TimerState(snapshot.clone()));

        info!(connection = %id, exam_id = %exam_id, viewer_id = ?conn.viewer_id, "Viewer joined exam");
        true
    }

    /// Forget a connection. Timer state is never touched.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.lock();
        let exam_id = inner.leave_current(id);
        if inner.connections.remove(&id).is_some() {
            debug!("Viewer connection {} closed (exam: {:?})", id, exam_id);
        }
    }

    /// Number of connections currently watching an exam
    pub fn audience_size(&self, exam_id: &str) -> usize {
        self.lock().audiences.get(exam_id).map_or(0, HashSet::len)
    }

    /// Exam a connection is currently watching
    pub fn exam_of(&self, id: ConnectionId) -> Option<String> {
        self.lock().connections.get(&id).and_then(|conn| conn.exam_id.clone())
    }

    /// Viewer id a connection joined with
    pub fn viewer_of(&self, id: ConnectionId) -> Option<String> {
        self.lock().connections.get(&id).and_then(|conn| conn.viewer_id.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }
}

impl Broadcaster for AudienceHub {
    fn broadcast_state(&self, snapshot: &TimerSnapshot) {
        let message = ServerMessage::TimerState(snapshot.clone());
        let delivered = self.lock().send_to_audience(&snapshot.exam_id, &message);
        debug!(
            exam_id = %snapshot.exam_id,
            remaining_ms = snapshot.remaining_ms,
            running = snapshot.running,
            delivered,
            "Broadcast timer state"
        );
    }

    fn broadcast_finished(&self, exam_id: &str) {
        let delivered = self.lock().send_to_audience(exam_id, &ServerMessage::finished(exam_id));
        info!(exam_id = %exam_id, delivered, "Broadcast timer finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TimerState;

    fn snapshot(exam_id: &str) -> TimerSnapshot {
        TimerState::new(exam_id, Some(1_000)).snapshot(0)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn join_sends_private_snapshot_only_to_joiner() {
        let hub = AudienceHub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = hub.register(tx_a);
        let b = hub.register(tx_b);

        assert!(hub.join(a, Some("student-1".into()), &snapshot("exam-1")));
        assert_eq!(drain(&mut rx_a), vec![ServerMessage::TimerState(snapshot("exam-1"))]);

        assert!(hub.join(b, None, &snapshot("exam-1")));
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert_eq!(hub.audience_size("exam-1"), 2);
        assert_eq!(hub.viewer_of(a).as_deref(), Some("student-1"));
    }

    #[test]
    fn switching_exams_leaves_previous_audience() {
        let hub = AudienceHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx);

        hub.join(id, None, &snapshot("exam-1"));
        hub.join(id, None, &snapshot("exam-2"));
        drain(&mut rx);

        assert_eq!(hub.audience_size("exam-1"), 0);
        assert_eq!(hub.audience_size("exam-2"), 1);
        assert_eq!(hub.exam_of(id).as_deref(), Some("exam-2"));

        hub.broadcast_state(&snapshot("exam-1"));
        assert!(drain(&mut rx).is_empty());
        hub.broadcast_finished("exam-2");
        assert_eq!(drain(&mut rx), vec![ServerMessage::finished("exam-2")]);
    }

    #[test]
    fn broadcast_reaches_whole_audience() {
        let hub = AudienceHub::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = mpsc::unbounded_channel();
            let id = hub.register(tx);
            hub.join(id, None, &snapshot("exam-1"));
            receivers.push(rx);
        }
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();
        let other = hub.register(tx_other);
        hub.join(other, None, &snapshot("exam-9"));
        drain(&mut rx_other);

        hub.broadcast_state(&snapshot("exam-1"));
        for rx in receivers.iter_mut() {
            assert_eq!(drain(rx).len(), 2);
        }
        assert!(drain(&mut rx_other).is_empty());
    }

    #[test]
    fn disconnect_removes_membership() {
        let hub = AudienceHub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx);
        hub.join(id, None, &snapshot("exam-1"));

        hub.disconnect(id);
        drop(rx);
        assert_eq!(hub.audience_size("exam-1"), 0);
        assert_eq!(hub.connection_count(), 0);
        assert!(!hub.join(id, None, &snapshot("exam-1")));
    }

    #[test]
    fn closed_receiver_is_skipped() {
        let hub = AudienceHub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx);
        hub.join(id, None, &snapshot("exam-1"));
        drop(rx);

        // must not panic
        hub.broadcast_state(&snapshot("exam-1"));
        hub.broadcast_finished("exam-1");
    }
}
