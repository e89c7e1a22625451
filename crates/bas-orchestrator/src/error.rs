use thiserror::Error;

use bas_core::RepositoryError;
use bas_scoring::ScenarioValidationError;

/// Caller-surfaced failures during plan construction and validation (§7:
/// Validation, Planning-empty). Dispatch-time failures of individual tasks
/// are not represented here — they become `ExecutionResult` transitions.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("scenario {0} produced an empty plan")]
    EmptyPlan(String),
    #[error("scenario {scenario} references unknown technique {technique_id}")]
    UnknownTechnique {
        scenario: String,
        technique_id: String,
    },
    #[error("agent {paw} is unavailable for dispatch: {reason}")]
    AgentUnavailable { paw: String, reason: String },
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("scenario {0} not found")]
    ScenarioNotFound(String),
    #[error("execution {0} not found")]
    ExecutionNotFound(String),
    #[error("execution {0} is already terminal")]
    CancelOnTerminal(String),
    #[error(transparent)]
    Validation(#[from] ScenarioValidationError),
    #[error(transparent)]
    Planning(#[from] PlanError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
