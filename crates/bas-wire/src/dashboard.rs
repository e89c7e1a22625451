//! Frames broadcast to dashboard sessions by the Event Publisher.

use serde::{Deserialize, Serialize};

use bas_types::Execution;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEventPayload {
    pub execution_id: String,
    pub data: Execution,
}

#[derive(Debug, Clone)]
pub enum DashboardFrame {
    ExecutionStarted(ExecutionEventPayload),
    ExecutionCompleted(ExecutionEventPayload),
    ExecutionCancelled(ExecutionEventPayload),
}

impl DashboardFrame {
    pub fn execution_id(&self) -> &str {
        match self {
            DashboardFrame::ExecutionStarted(p)
            | DashboardFrame::ExecutionCompleted(p)
            | DashboardFrame::ExecutionCancelled(p) => &p.execution_id,
        }
    }
}

pub const TYPE_EXECUTION_STARTED: &str = "execution_started";
pub const TYPE_EXECUTION_COMPLETED: &str = "execution_completed";
pub const TYPE_EXECUTION_CANCELLED: &str = "execution_cancelled";
