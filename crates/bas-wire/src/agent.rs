//! Frames an agent sends to the server.

use serde::{Deserialize, Serialize};

use bas_types::Platform;

/// Must be the first frame on a new agent connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub paw: String,
    pub hostname: String,
    #[serde(default)]
    pub username: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub executors: Vec<String>,
}

/// Emitted every `heartbeat_interval` (default 30s) by a registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub paw: String,
}

/// The terminal result of one dispatched task.
///
/// `detected`/`blocked` is an optional out-of-band signal from an external
/// EDR integration; when absent the orchestrator's default classifier
/// derives a status from `success` and `exit_code` alone (see
/// `bas_orchestrator::classify`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultPayload {
    pub task_id: String,
    pub technique_id: String,
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub detection_hint: Option<DetectionHint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionHint {
    Blocked,
    Detected,
}

/// A decoded agent-originated frame. `Unknown` carries the raw type string
/// and payload so the caller can log and discard it per the codec's
/// unknown-type policy.
#[derive(Debug, Clone)]
pub enum AgentFrame {
    Register(RegisterPayload),
    Heartbeat(HeartbeatPayload),
    TaskResult(TaskResultPayload),
    Unknown(String, serde_json::Value),
}

pub const TYPE_REGISTER: &str = "register";
pub const TYPE_HEARTBEAT: &str = "heartbeat";
pub const TYPE_TASK_RESULT: &str = "task_result";
