//! Push-channel wire messages
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::state::TimerSnapshot;

/// Messages sent from viewers to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinExam(JoinExam),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinExam {
    pub exam_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Messages pushed from the server to viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    TimerState(TimerSnapshot),
    TimerFinished(TimerFinished),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerFinished {
    pub exam_id: String,
}

impl ServerMessage {
    pub fn finished(exam_id: impl Into<String>) -> Self {
        Self::TimerFinished(TimerFinished {
            exam_id: exam_id.into(),
        })
    }
}
