use async_trait::async_trait;

use bas_types::{Agent, AgentStatus, Scenario, Technique};
use chrono::{DateTime, Utc};

use crate::error::RepositoryError;

type Result<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn create(&self, agent: Agent) -> Result<()>;
    async fn update(&self, agent: Agent) -> Result<()>;
    async fn find_by_paw(&self, paw: &str) -> Result<Option<Agent>>;
    async fn find_by_paws(&self, paws: &[String]) -> Result<Vec<Agent>>;
    async fn find_by_status(&self, status: AgentStatus) -> Result<Vec<Agent>>;
    async fn update_last_seen(&self, paw: &str, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait TechniqueRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Technique>>;
    async fn find_all(&self) -> Result<Vec<Technique>>;
    async fn find_by_tactic(&self, tactic: &str) -> Result<Vec<Technique>>;
    async fn find_by_platform(&self, platform: bas_types::Platform) -> Result<Vec<Technique>>;
}

#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    async fn create(&self, scenario: Scenario) -> Result<()>;
    async fn update(&self, scenario: Scenario) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Scenario>>;
    async fn find_all(&self) -> Result<Vec<Scenario>>;
    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Scenario>>;
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn create_execution(&self, execution: bas_types::Execution) -> Result<()>;
    async fn update_execution(&self, execution: bas_types::Execution) -> Result<()>;
    async fn find_execution(&self, id: &str) -> Result<Option<bas_types::Execution>>;
    async fn find_recent_executions(&self, limit: usize) -> Result<Vec<bas_types::Execution>>;
    async fn find_executions_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<bas_types::Execution>>;

    async fn create_result(&self, result: bas_types::ExecutionResult) -> Result<()>;
    async fn update_result(&self, result: bas_types::ExecutionResult) -> Result<()>;
    async fn find_result(&self, id: &str) -> Result<Option<bas_types::ExecutionResult>>;
    async fn find_result_by_task_id(
        &self,
        task_id: &str,
    ) -> Result<Option<bas_types::ExecutionResult>>;
    async fn find_results_by_execution(
        &self,
        execution_id: &str,
    ) -> Result<Vec<bas_types::ExecutionResult>>;
}
