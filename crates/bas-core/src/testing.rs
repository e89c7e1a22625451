//! An in-memory implementation of the repository contracts in `repository`.
//!
//! This is test scaffolding, not a production persistence layer: persistence
//! is explicitly out of scope for the core (see SPEC_FULL.md §1/§6). It
//! exists so orchestrator and hub tests can exercise full execution
//! lifecycles without a real database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bas_types::{Agent, AgentStatus, Execution, ExecutionResult, Platform, Scenario, Technique};

use crate::error::RepositoryError;
use crate::repository::{AgentRepository, ResultRepository, ScenarioRepository, TechniqueRepository};

type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    agents: Arc<RwLock<HashMap<String, Agent>>>,
    techniques: Arc<RwLock<HashMap<String, Technique>>>,
    scenarios: Arc<RwLock<HashMap<String, Scenario>>>,
    executions: Arc<RwLock<HashMap<String, Execution>>>,
    results: Arc<RwLock<HashMap<String, ExecutionResult>>>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_agent(&self, agent: Agent) {
        self.agents.write().await.insert(agent.paw.clone(), agent);
    }

    pub async fn seed_technique(&self, technique: Technique) {
        self.techniques
            .write()
            .await
            .insert(technique.id.clone(), technique);
    }

    pub async fn seed_scenario(&self, scenario: Scenario) {
        self.scenarios
            .write()
            .await
            .insert(scenario.id.clone(), scenario);
    }
}

#[async_trait]
impl AgentRepository for InMemoryRepositories {
    async fn create(&self, agent: Agent) -> Result<()> {
        self.agents.write().await.insert(agent.paw.clone(), agent);
        Ok(())
    }

    async fn update(&self, agent: Agent) -> Result<()> {
        self.agents.write().await.insert(agent.paw.clone(), agent);
        Ok(())
    }

    async fn find_by_paw(&self, paw: &str) -> Result<Option<Agent>> {
        Ok(self.agents.read().await.get(paw).cloned())
    }

    async fn find_by_paws(&self, paws: &[String]) -> Result<Vec<Agent>> {
        let agents = self.agents.read().await;
        Ok(paws.iter().filter_map(|p| agents.get(p).cloned()).collect())
    }

    async fn find_by_status(&self, status: AgentStatus) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .read()
            .await
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    async fn update_last_seen(&self, paw: &str, at: DateTime<Utc>) -> Result<()> {
        let mut agents = self.agents.write().await;
        match agents.get_mut(paw) {
            Some(agent) => {
                agent.last_seen = at;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(paw.to_string())),
        }
    }
}

#[async_trait]
impl TechniqueRepository for InMemoryRepositories {
    async fn find_by_id(&self, id: &str) -> Result<Option<Technique>> {
        Ok(self.techniques.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Technique>> {
        Ok(self.techniques.read().await.values().cloned().collect())
    }

    async fn find_by_tactic(&self, tactic: &str) -> Result<Vec<Technique>> {
        Ok(self
            .techniques
            .read()
            .await
            .values()
            .filter(|t| t.tactics.iter().any(|tc| tc == tactic))
            .cloned()
            .collect())
    }

    async fn find_by_platform(&self, platform: Platform) -> Result<Vec<Technique>> {
        Ok(self
            .techniques
            .read()
            .await
            .values()
            .filter(|t| t.platforms.contains(&platform))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScenarioRepository for InMemoryRepositories {
    async fn create(&self, scenario: Scenario) -> Result<()> {
        self.scenarios
            .write()
            .await
            .insert(scenario.id.clone(), scenario);
        Ok(())
    }

    async fn update(&self, scenario: Scenario) -> Result<()> {
        self.scenarios
            .write()
            .await
            .insert(scenario.id.clone(), scenario);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Scenario>> {
        Ok(self.scenarios.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Scenario>> {
        Ok(self.scenarios.read().await.values().cloned().collect())
    }

    async fn find_by_tag(&self, _tag: &str) -> Result<Vec<Scenario>> {
        // Tags are not part of the core Scenario model; the tag index lives
        // in the (out-of-scope) persistence layer. Returns everything so
        // callers in tests are not surprised by an empty result.
        Ok(self.scenarios.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepositories {
    async fn create_execution(&self, execution: Execution) -> Result<()> {
        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution);
        Ok(())
    }

    async fn update_execution(&self, execution: Execution) -> Result<()> {
        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution);
        Ok(())
    }

    async fn find_execution(&self, id: &str) -> Result<Option<Execution>> {
        Ok(self.executions.read().await.get(id).cloned())
    }

    async fn find_recent_executions(&self, limit: usize) -> Result<Vec<Execution>> {
        let mut executions: Vec<Execution> =
            self.executions.read().await.values().cloned().collect();
        executions.sort_by_key(|e| std::cmp::Reverse(e.started_at));
        executions.truncate(limit);
        Ok(executions)
    }

    async fn find_executions_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Execution>> {
        Ok(self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.started_at >= from && e.started_at <= to)
            .cloned()
            .collect())
    }

    async fn create_result(&self, result: ExecutionResult) -> Result<()> {
        self.results.write().await.insert(result.id.clone(), result);
        Ok(())
    }

    async fn update_result(&self, result: ExecutionResult) -> Result<()> {
        self.results.write().await.insert(result.id.clone(), result);
        Ok(())
    }

    async fn find_result(&self, id: &str) -> Result<Option<ExecutionResult>> {
        Ok(self.results.read().await.get(id).cloned())
    }

    async fn find_result_by_task_id(&self, task_id: &str) -> Result<Option<ExecutionResult>> {
        Ok(self
            .results
            .read()
            .await
            .values()
            .find(|r| r.task_id == task_id)
            .cloned())
    }

    async fn find_results_by_execution(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionResult>> {
        Ok(self
            .results
            .read()
            .await
            .values()
            .filter(|r| r.execution_id == execution_id)
            .cloned()
            .collect())
    }
}
