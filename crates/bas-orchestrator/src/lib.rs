//! Execution orchestration: turns a scenario and a set of target agents
//! into a dispatched, phase-ordered plan, ingests the results that come
//! back, and scores the finished execution.
//!
//! [`plan`] builds and validates the plan; [`classify`] turns a raw
//! `task_result` payload into a terminal status; [`orchestrator`] owns the
//! whole lifecycle; [`lifecycle`] and [`reaper`] are the two background
//! processes that drive it without a direct caller.

pub mod classify;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod plan;
pub mod reaper;

pub use error::{OrchestratorError, PlanError};
pub use lifecycle::LifecycleManager;
pub use orchestrator::Orchestrator;
pub use reaper::Reaper;
