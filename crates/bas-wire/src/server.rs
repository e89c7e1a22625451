//! Frames the server sends to an agent.

use serde::{Deserialize, Serialize};

/// Acknowledges a `register` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredPayload {
    pub status: String,
    pub paw: String,
}

impl RegisteredPayload {
    pub fn ok(paw: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            paw: paw.into(),
        }
    }
}

/// One unit of dispatched work, matching a `PlannedTask` one-to-one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: String,
    pub technique_id: String,
    pub command: String,
    pub executor: String,
    pub timeout: u64,
    #[serde(default)]
    pub cleanup: Option<String>,
}

/// Optional positive receipt; not load-bearing per the concurrency model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAckPayload {
    pub task_id: String,
    pub status: String,
}

impl TaskAckPayload {
    pub fn received(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: "received".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServerFrame {
    Registered(RegisteredPayload),
    Task(TaskPayload),
    TaskAck(TaskAckPayload),
}

pub const TYPE_REGISTERED: &str = "registered";
pub const TYPE_TASK: &str = "task";
pub const TYPE_TASK_ACK: &str = "task_ack";
