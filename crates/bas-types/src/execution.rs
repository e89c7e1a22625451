use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::score::SecurityScore;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Pending,
    Running,
    Success,
    Blocked,
    Detected,
    Failed,
    Skipped,
    Timeout,
}

impl ResultStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::Pending | ResultStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// One run of a scenario against a set of agents.
///
/// Exists only after plan construction succeeds. Terminal statuses never
/// transition again; ownership of mutation belongs to the orchestrator until
/// a terminal state is reached (see `bas_orchestrator`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub scenario_id: String,
    pub agent_paws: BTreeSet<String>,
    pub status: ExecutionStatus,
    pub progress: Progress,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub safe_mode: bool,
    #[serde(default)]
    pub score: Option<SecurityScore>,
}

impl Execution {
    pub fn new(
        id: impl Into<String>,
        scenario_id: impl Into<String>,
        agent_paws: BTreeSet<String>,
        safe_mode: bool,
        total_tasks: u64,
    ) -> Self {
        Self {
            id: id.into(),
            scenario_id: scenario_id.into(),
            agent_paws,
            status: ExecutionStatus::Pending,
            progress: Progress {
                total: total_tasks,
                ..Progress::default()
            },
            started_at: Utc::now(),
            completed_at: None,
            safe_mode,
            score: None,
        }
    }
}

/// The persistent outcome record of one `PlannedTask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: String,
    pub execution_id: String,
    pub task_id: String,
    pub technique_id: String,
    pub agent_paw: String,
    pub executor_name: Option<String>,
    pub command: String,
    pub status: ResultStatus,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionResult {
    pub fn pending(
        id: impl Into<String>,
        execution_id: impl Into<String>,
        task_id: impl Into<String>,
        technique_id: impl Into<String>,
        agent_paw: impl Into<String>,
        executor_name: Option<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            execution_id: execution_id.into(),
            task_id: task_id.into(),
            technique_id: technique_id.into(),
            agent_paw: agent_paw.into(),
            executor_name,
            command: command.into(),
            status: ResultStatus::Pending,
            output: None,
            exit_code: None,
            detected: false,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}
