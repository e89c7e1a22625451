use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Notify, RwLock};
use uuid::Uuid;

use bas_core::{AgentRepository, EngineConfig, EventBus, ResultRepository, ScenarioRepository, TechniqueRepository};
use bas_hub::Hub;
use bas_types::{Execution, ExecutionPlan, ExecutionResult, ExecutionStatus, PlannedTask, Progress, ResultStatus};
use bas_wire::{DashboardFrame, ExecutionEventPayload, ServerFrame, TaskPayload, TaskResultPayload};

use crate::classify;
use crate::error::OrchestratorError;
use crate::plan;

/// Per-execution coordination: a lock serializing mutations to that
/// execution's state, and a `Notify` so the phase-dispatch loop can wake up
/// as soon as a result it's waiting on reaches a terminal state instead of
/// polling (SPEC_FULL.md §5's "waiting on phase completion via condition
/// variable or channel").
#[derive(Default)]
struct ExecutionSync {
    lock: Mutex<()>,
    notify: Notify,
}

fn progress_from_results(results: &[ExecutionResult]) -> Progress {
    let mut progress = Progress {
        total: results.len() as u64,
        ..Progress::default()
    };
    for result in results {
        match result.status {
            ResultStatus::Success | ResultStatus::Blocked | ResultStatus::Detected => {
                progress.completed += 1
            }
            ResultStatus::Failed | ResultStatus::Timeout => progress.failed += 1,
            ResultStatus::Skipped => progress.skipped += 1,
            ResultStatus::Pending | ResultStatus::Running => {}
        }
    }
    progress
}

/// Builds, dispatches, and closes out executions (SPEC_FULL.md §4.5). Cheap
/// to clone: every field is an `Arc` or a small `Copy`-ish config struct, so
/// background tasks (phase dispatch, the lifecycle sweep, disconnect
/// handling) each hold their own clone rather than a reference.
#[derive(Clone)]
pub struct Orchestrator {
    hub: Arc<Hub>,
    event_bus: Arc<EventBus>,
    agent_repo: Arc<dyn AgentRepository>,
    technique_repo: Arc<dyn TechniqueRepository>,
    scenario_repo: Arc<dyn ScenarioRepository>,
    result_repo: Arc<dyn ResultRepository>,
    config: EngineConfig,
    sync: Arc<RwLock<HashMap<String, Arc<ExecutionSync>>>>,
    active: Arc<RwLock<HashSet<String>>>,
}

impl Orchestrator {
    pub fn new(
        hub: Arc<Hub>,
        event_bus: Arc<EventBus>,
        agent_repo: Arc<dyn AgentRepository>,
        technique_repo: Arc<dyn TechniqueRepository>,
        scenario_repo: Arc<dyn ScenarioRepository>,
        result_repo: Arc<dyn ResultRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            hub,
            event_bus,
            agent_repo,
            technique_repo,
            scenario_repo,
            result_repo,
            config,
            sync: Arc::new(RwLock::new(HashMap::new())),
            active: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    async fn sync_for(&self, execution_id: &str) -> Arc<ExecutionSync> {
        if let Some(sync) = self.sync.read().await.get(execution_id) {
            return sync.clone();
        }
        self.sync
            .write()
            .await
            .entry(execution_id.to_string())
            .or_insert_with(|| Arc::new(ExecutionSync::default()))
            .clone()
    }

    async fn is_execution_terminal(&self, execution_id: &str) -> bool {
        matches!(
            self.result_repo.find_execution(execution_id).await,
            Ok(Some(execution)) if execution.status.is_terminal()
        )
    }

    /// Builds the plan, persists the `Execution` and its `pending` `Result`
    /// rows, emits `execution_started`, and spawns the phase-by-phase
    /// dispatch as a background task. Returns the execution id immediately;
    /// the caller does not wait for any task to finish.
    pub async fn start_execution(
        &self,
        scenario_id: &str,
        target_agents: Vec<String>,
        safe_mode: bool,
    ) -> Result<String, OrchestratorError> {
        let scenario = self
            .scenario_repo
            .find_by_id(scenario_id)
            .await?
            .ok_or_else(|| OrchestratorError::ScenarioNotFound(scenario_id.to_string()))?;

        let mut technique_ids = HashSet::new();
        for phase in &scenario.phases {
            for selection in &phase.selections {
                technique_ids.insert(selection.technique_id.clone());
            }
        }
        let mut techniques = HashMap::new();
        for id in &technique_ids {
            if let Some(technique) = self.technique_repo.find_by_id(id).await? {
                techniques.insert(id.clone(), technique);
            }
        }
        bas_scoring::validate_scenario(&scenario, &techniques)?;

        let agents = self.agent_repo.find_by_paws(&target_agents).await?;
        let agents_map: HashMap<String, _> =
            agents.into_iter().map(|a| (a.paw.clone(), a)).collect();

        let execution_plan =
            plan::build_plan(&scenario, &techniques, &agents_map, &target_agents, safe_mode)?;
        plan::validate_plan(&execution_plan, &agents_map, &techniques)?;

        let mut execution = Execution::new(
            Uuid::new_v4().to_string(),
            scenario.id.clone(),
            target_agents.iter().cloned().collect(),
            safe_mode,
            execution_plan.tasks.len() as u64,
        );
        self.result_repo.create_execution(execution.clone()).await?;

        for task in &execution_plan.tasks {
            let result = ExecutionResult::pending(
                Uuid::new_v4().to_string(),
                execution.id.clone(),
                task.task_id.clone(),
                task.technique_id.clone(),
                task.agent_paw.clone(),
                task.executor_name.clone(),
                task.command.clone(),
            );
            self.result_repo.create_result(result).await?;
        }

        self.active.write().await.insert(execution.id.clone());
        tracing::info!(execution_id = %execution.id, scenario_id = %scenario.id, tasks = execution_plan.tasks.len(), "execution started");
        self.event_bus.publish(DashboardFrame::ExecutionStarted(ExecutionEventPayload {
            execution_id: execution.id.clone(),
            data: execution.clone(),
        }));

        execution.status = ExecutionStatus::Running;
        self.result_repo.update_execution(execution.clone()).await?;

        let orchestrator = self.clone();
        let execution_id = execution.id.clone();
        tokio::spawn(async move {
            orchestrator.run_dispatch(execution_id, execution_plan).await;
        });

        Ok(execution.id)
    }

    async fn run_dispatch(&self, execution_id: String, plan: ExecutionPlan) {
        for phase_order in plan.phase_orders() {
            if self.is_execution_terminal(&execution_id).await {
                break;
            }
            let tasks: Vec<PlannedTask> = plan.tasks_in_phase(phase_order).cloned().collect();
            let task_ids: Vec<String> = tasks.iter().map(|t| t.task_id.clone()).collect();
            self.dispatch_phase(&execution_id, tasks).await;
            self.wait_for_phase_terminal(&execution_id, &task_ids).await;
        }
    }

    async fn dispatch_phase(&self, execution_id: &str, tasks: Vec<PlannedTask>) {
        let semaphore = self
            .config
            .dispatch_concurrency
            .map(|n| Arc::new(tokio::sync::Semaphore::new(n)));
        let mut join_set = tokio::task::JoinSet::new();
        for task in tasks {
            let permit = match &semaphore {
                Some(sem) => Some(sem.clone().acquire_owned().await.expect("semaphore never closed")),
                None => None,
            };
            let orchestrator = self.clone();
            let execution_id = execution_id.to_string();
            join_set.spawn(async move {
                let _permit = permit;
                orchestrator.dispatch_one(&execution_id, &task).await;
            });
        }
        while join_set.join_next().await.is_some() {}
    }

    async fn dispatch_one(&self, execution_id: &str, task: &PlannedTask) {
        let frame = ServerFrame::Task(TaskPayload {
            id: task.task_id.clone(),
            technique_id: task.technique_id.clone(),
            command: task.command.clone(),
            executor: task.executor_name.clone().unwrap_or_default(),
            timeout: task.timeout_secs,
            cleanup: task.cleanup.clone(),
        });
        let sent = match bas_wire::encode_server_frame(&frame) {
            Ok(bytes) => self.hub.send_to_agent(&task.agent_paw, bytes).await,
            Err(err) => {
                tracing::error!(task_id = %task.task_id, error = %err, "failed to encode task frame");
                false
            }
        };

        let sync = self.sync_for(execution_id).await;
        let became_terminal = {
            let _guard = sync.lock.lock().await;
            let Ok(Some(mut result)) = self.result_repo.find_result_by_task_id(&task.task_id).await
            else {
                tracing::error!(task_id = %task.task_id, "dispatched task has no matching result row");
                return;
            };
            if result.status.is_terminal() {
                return;
            }
            if sent {
                result.status = ResultStatus::Running;
                result.started_at = Some(Utc::now());
                let _ = self.result_repo.update_result(result).await;
                tracing::info!(execution_id, task_id = %task.task_id, paw = %task.agent_paw, "task dispatched");
                false
            } else {
                result.status = ResultStatus::Failed;
                result.error = Some("agent session unavailable at dispatch time".to_string());
                result.completed_at = Some(Utc::now());
                let _ = self.result_repo.update_result(result).await;
                tracing::error!(execution_id, task_id = %task.task_id, paw = %task.agent_paw, "dispatch dropped, result marked failed");
                true
            }
        };
        if became_terminal {
            self.on_result_terminal(execution_id).await;
        }
    }

    /// Handles one `task_result` frame. Discards it (logging why) if the
    /// task id is unknown, the reporting agent doesn't match, or the result
    /// is already terminal — the last case covers both a duplicate report
    /// and a result that was skipped by cancellation before the agent
    /// answered.
    pub async fn handle_task_result(&self, payload: TaskResultPayload, reporting_paw: &str) {
        let task_id = payload.task_id.clone();
        let Ok(Some(mut result)) = self.result_repo.find_result_by_task_id(&task_id).await else {
            tracing::warn!(task_id = %task_id, "task_result for unknown task id, discarding");
            return;
        };
        if result.agent_paw != reporting_paw {
            tracing::warn!(task_id = %task_id, expected = %result.agent_paw, reported_by = %reporting_paw, "task_result agent mismatch, discarding");
            return;
        }

        let execution_id = result.execution_id.clone();
        let sync = self.sync_for(&execution_id).await;
        {
            let _guard = sync.lock.lock().await;
            if result.status.is_terminal() {
                tracing::debug!(task_id = %task_id, "late task_result for terminal result, discarding");
                return;
            }
            let status = classify::classify_result(&payload);
            result.status = status;
            result.output = Some(payload.output.clone());
            result.exit_code = Some(payload.exit_code);
            result.error = (!payload.error.is_empty()).then(|| payload.error.clone());
            result.detected = matches!(status, ResultStatus::Detected | ResultStatus::Blocked);
            result.completed_at = Some(Utc::now());
            if let Err(err) = self.result_repo.update_result(result).await {
                tracing::error!(error = %err, task_id = %task_id, "failed to persist task result");
                return;
            }
        }
        self.on_result_terminal(&execution_id).await;
    }

    /// Transitions a single result to a terminal state if it isn't already
    /// one. Used by the timeout sweep and disconnect handling, which only
    /// know a result id and the outcome, not the full classification path.
    async fn transition_result(&self, execution_id: &str, result_id: &str, status: ResultStatus, error: String) {
        let sync = self.sync_for(execution_id).await;
        let transitioned = {
            let _guard = sync.lock.lock().await;
            let Ok(Some(mut result)) = self.result_repo.find_result(result_id).await else {
                return;
            };
            if result.status.is_terminal() {
                return;
            }
            result.status = status;
            result.error = Some(error);
            result.completed_at = Some(Utc::now());
            self.result_repo.update_result(result).await.is_ok()
        };
        if transitioned {
            self.on_result_terminal(execution_id).await;
        }
    }

    /// Per-task timeout sweep (SPEC_FULL.md §4.6.1): called on a fixed
    /// interval by the lifecycle manager.
    pub async fn sweep_timeouts(&self) {
        let execution_ids: Vec<String> = self.active.read().await.iter().cloned().collect();
        for execution_id in execution_ids {
            if let Err(err) = self.sweep_execution_timeouts(&execution_id).await {
                tracing::error!(execution_id = %execution_id, error = %err, "timeout sweep failed");
            }
        }
    }

    async fn sweep_execution_timeouts(&self, execution_id: &str) -> Result<(), bas_core::RepositoryError> {
        let results = self.result_repo.find_results_by_execution(execution_id).await?;
        let now = Utc::now();
        let grace = chrono::Duration::from_std(self.config.timeout_grace()).unwrap_or(chrono::Duration::seconds(10));
        for result in results.into_iter().filter(|r| r.status == ResultStatus::Running) {
            let Some(started_at) = result.started_at else {
                continue;
            };
            let timeout = self.task_timeout(&result).await;
            if now - started_at > timeout + grace {
                tracing::warn!(execution_id, task_id = %result.task_id, "task exceeded timeout");
                self.transition_result(
                    execution_id,
                    &result.id,
                    ResultStatus::Timeout,
                    "task execution exceeded its timeout".to_string(),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn task_timeout(&self, result: &ExecutionResult) -> chrono::Duration {
        if let Ok(Some(technique)) = self.technique_repo.find_by_id(&result.technique_id).await {
            if let Some(name) = &result.executor_name {
                if let Some(executor) = technique.executor_by_name(name) {
                    return chrono::Duration::seconds(executor.timeout_secs as i64);
                }
            }
        }
        chrono::Duration::from_std(self.config.default_task_timeout)
            .unwrap_or(chrono::Duration::seconds(300))
    }

    /// Disconnect-induced failure (SPEC_FULL.md §4.6.2): fails every
    /// `running` result bound to `paw` across active executions. Wired as
    /// the hub's disconnect callback via [`crate::lifecycle::install`].
    pub async fn handle_agent_disconnect(&self, paw: String) {
        let execution_ids: Vec<String> = self.active.read().await.iter().cloned().collect();
        for execution_id in execution_ids {
            let Ok(results) = self.result_repo.find_results_by_execution(&execution_id).await else {
                continue;
            };
            for result in results
                .into_iter()
                .filter(|r| r.status == ResultStatus::Running && r.agent_paw == paw)
            {
                tracing::warn!(execution_id = %execution_id, paw = %paw, task_id = %result.task_id, "agent disconnected mid-task");
                self.transition_result(
                    &execution_id,
                    &result.id,
                    ResultStatus::Failed,
                    "agent disconnected".to_string(),
                )
                .await;
            }
        }
    }

    async fn on_result_terminal(&self, execution_id: &str) {
        let sync = self.sync_for(execution_id).await;
        sync.notify.notify_waiters();

        let Ok(results) = self.result_repo.find_results_by_execution(execution_id).await else {
            return;
        };
        if let Ok(Some(mut execution)) = self.result_repo.find_execution(execution_id).await {
            if !execution.status.is_terminal() {
                execution.progress = progress_from_results(&results);
                let _ = self.result_repo.update_execution(execution).await;
            }
        }
        if results.iter().all(|r| r.status.is_terminal()) {
            self.finalize(execution_id).await;
        }
    }

    /// Computes the score and transitions the execution to `completed`, once
    /// every result has reached a terminal state. A no-op if the execution
    /// already reached a terminal state some other way (cancellation beat
    /// this call here).
    async fn finalize(&self, execution_id: &str) {
        let sync = self.sync_for(execution_id).await;
        let _guard = sync.lock.lock().await;

        let Ok(Some(mut execution)) = self.result_repo.find_execution(execution_id).await else {
            return;
        };
        if execution.status.is_terminal() {
            return;
        }
        let Ok(results) = self.result_repo.find_results_by_execution(execution_id).await else {
            return;
        };
        if !results.iter().all(|r| r.status.is_terminal()) {
            return;
        }

        let mut techniques = HashMap::new();
        let mut seen = HashSet::new();
        for result in &results {
            if seen.insert(result.technique_id.clone()) {
                if let Ok(Some(technique)) = self.technique_repo.find_by_id(&result.technique_id).await {
                    techniques.insert(technique.id.clone(), technique);
                }
            }
        }
        let score = bas_scoring::calculate(&results, &techniques);

        execution.progress = progress_from_results(&results);
        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        execution.score = Some(score);
        if self.result_repo.update_execution(execution.clone()).await.is_err() {
            return;
        }
        tracing::info!(
            execution_id,
            overall_score = execution.score.as_ref().map(|s| s.overall),
            "execution completed"
        );
        self.event_bus.publish(DashboardFrame::ExecutionCompleted(ExecutionEventPayload {
            execution_id: execution.id.clone(),
            data: execution,
        }));
        self.active.write().await.remove(execution_id);
    }

    async fn wait_for_phase_terminal(&self, execution_id: &str, task_ids: &[String]) {
        loop {
            if self.is_execution_terminal(execution_id).await {
                return;
            }
            let sync = self.sync_for(execution_id).await;
            let notified = sync.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.phase_all_terminal(task_ids).await {
                return;
            }
            notified.await;
        }
    }

    async fn phase_all_terminal(&self, task_ids: &[String]) -> bool {
        for task_id in task_ids {
            match self.result_repo.find_result_by_task_id(task_id).await {
                Ok(Some(result)) if result.status.is_terminal() => continue,
                _ => return false,
            }
        }
        true
    }

    /// Cancels a pending or running execution (SPEC_FULL.md §4.5
    /// "Cancellation"). Returns `CancelOnTerminal` for an execution that has
    /// already reached a terminal state; no state changes in that case.
    pub async fn stop(&self, execution_id: &str) -> Result<(), OrchestratorError> {
        let sync = self.sync_for(execution_id).await;
        let _guard = sync.lock.lock().await;

        let mut execution = self
            .result_repo
            .find_execution(execution_id)
            .await?
            .ok_or_else(|| OrchestratorError::ExecutionNotFound(execution_id.to_string()))?;
        if execution.status.is_terminal() {
            return Err(OrchestratorError::CancelOnTerminal(execution_id.to_string()));
        }

        let results = self.result_repo.find_results_by_execution(execution_id).await?;
        for mut result in results.into_iter().filter(|r| !r.status.is_terminal()) {
            result.status = ResultStatus::Skipped;
            result.completed_at = Some(Utc::now());
            self.result_repo.update_result(result).await?;
        }

        let results = self.result_repo.find_results_by_execution(execution_id).await?;
        execution.progress = progress_from_results(&results);
        execution.status = ExecutionStatus::Cancelled;
        execution.completed_at = Some(Utc::now());
        self.result_repo.update_execution(execution.clone()).await?;
        tracing::info!(execution_id, "execution cancelled");
        self.event_bus.publish(DashboardFrame::ExecutionCancelled(ExecutionEventPayload {
            execution_id: execution.id.clone(),
            data: execution,
        }));
        self.active.write().await.remove(execution_id);
        sync.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bas_core::testing::InMemoryRepositories;
    use bas_hub::{Hub, SessionHandle, SessionKind};
    use bas_types::{Agent, Executor, Phase, Platform, Scenario, Technique, TechniqueSelection};

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    fn technique(id: &str, command: &str) -> Technique {
        Technique {
            id: id.to_string(),
            name: id.to_string(),
            tactics: vec!["discovery".to_string()],
            platforms: vec![Platform::Linux],
            executors: vec![Executor {
                name: None,
                executor_type: "sh".to_string(),
                platform: None,
                command: command.to_string(),
                cleanup: None,
                timeout_secs: 30,
                elevation_required: false,
                is_safe: None,
            }],
            is_safe: true,
        }
    }

    fn linux_agent(paw: &str) -> Agent {
        let mut agent = Agent::new(paw, format!("{paw}-host"), Platform::Linux);
        agent.executors.insert("sh".to_string());
        agent
    }

    fn scenario(technique_id: &str) -> Scenario {
        Scenario {
            id: "scenario-1".to_string(),
            name: "Scenario 1".to_string(),
            phases: vec![Phase {
                order: 0,
                selections: vec![TechniqueSelection {
                    technique_id: technique_id.to_string(),
                    executor_name: None,
                }],
            }],
        }
    }

    fn harness() -> (Orchestrator, Arc<Hub>, InMemoryRepositories) {
        let hub = Arc::new(Hub::new());
        let event_bus = Arc::new(EventBus::new());
        let repo = InMemoryRepositories::new();
        let repo_arc = Arc::new(repo.clone());
        let orchestrator = Orchestrator::new(
            hub.clone(),
            event_bus,
            repo_arc.clone(),
            repo_arc.clone(),
            repo_arc.clone(),
            repo_arc,
            EngineConfig::default(),
        );
        (orchestrator, hub, repo)
    }

    #[tokio::test]
    async fn start_execution_with_no_connected_agent_fails_every_task_and_completes() {
        let (orchestrator, _hub, repo) = harness();
        repo.seed_agent(linux_agent("agent-1")).await;
        repo.seed_technique(technique("T1082", "uname -a")).await;
        repo.seed_scenario(scenario("T1082")).await;

        let execution_id = orchestrator
            .start_execution("scenario-1", vec!["agent-1".to_string()], false)
            .await
            .unwrap();
        settle().await;

        let execution = repo.find_execution(&execution_id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.progress.failed, 1);
        assert!(execution.score.is_some());
    }

    #[tokio::test]
    async fn task_result_completes_execution_and_scores_it() {
        let (orchestrator, hub, repo) = harness();
        repo.seed_agent(linux_agent("agent-1")).await;
        repo.seed_technique(technique("T1082", "uname -a")).await;
        repo.seed_scenario(scenario("T1082")).await;

        let (session, mut outbound_rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("agent-1".to_string()));
        hub.register(session);
        settle().await;

        let execution_id = orchestrator
            .start_execution("scenario-1", vec!["agent-1".to_string()], false)
            .await
            .unwrap();
        settle().await;

        let frame = outbound_rx.recv().await.expect("task frame sent");
        let bytes = match frame {
            bas_hub::OutboundFrame::Data(bytes) => bytes,
            bas_hub::OutboundFrame::Ping => panic!("expected a task frame"),
        };
        let sent = bas_wire::decode_server_frame(&bytes).unwrap().unwrap();
        let task_id = match sent {
            ServerFrame::Task(payload) => payload.id,
            _ => panic!("expected a Task frame"),
        };

        orchestrator
            .handle_task_result(
                TaskResultPayload {
                    task_id,
                    technique_id: "T1082".to_string(),
                    success: true,
                    output: "Linux host-1".to_string(),
                    exit_code: 0,
                    error: String::new(),
                    detection_hint: None,
                },
                "agent-1",
            )
            .await;
        settle().await;

        let execution = repo.find_execution(&execution_id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.progress.completed, 1);
        // An uncontested success means the attack went entirely undetected,
        // which is the worst-for-the-defender end of the scale.
        assert_eq!(execution.score.unwrap().overall, 0.0);
    }

    #[tokio::test]
    async fn stop_skips_outstanding_results_and_marks_execution_cancelled() {
        let (orchestrator, hub, repo) = harness();
        repo.seed_agent(linux_agent("agent-1")).await;
        repo.seed_technique(technique("T1082", "uname -a")).await;
        repo.seed_scenario(scenario("T1082")).await;

        let (session, _outbound_rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("agent-1".to_string()));
        hub.register(session);
        settle().await;

        let execution_id = orchestrator
            .start_execution("scenario-1", vec!["agent-1".to_string()], false)
            .await
            .unwrap();
        settle().await;

        orchestrator.stop(&execution_id).await.unwrap();

        let execution = repo.find_execution(&execution_id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Cancelled);
        let results = repo.find_results_by_execution(&execution_id).await.unwrap();
        assert!(results.iter().all(|r| r.status == ResultStatus::Skipped));
    }

    #[tokio::test]
    async fn stop_on_an_already_terminal_execution_is_rejected() {
        let (orchestrator, _hub, repo) = harness();
        repo.seed_agent(linux_agent("agent-1")).await;
        repo.seed_technique(technique("T1082", "uname -a")).await;
        repo.seed_scenario(scenario("T1082")).await;

        let execution_id = orchestrator
            .start_execution("scenario-1", vec!["agent-1".to_string()], false)
            .await
            .unwrap();
        settle().await;

        let err = orchestrator.stop(&execution_id).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::CancelOnTerminal(_)));
    }

    #[tokio::test]
    async fn handle_task_result_for_unknown_task_id_is_discarded_without_panic() {
        let (orchestrator, _hub, _repo) = harness();
        orchestrator
            .handle_task_result(
                TaskResultPayload {
                    task_id: "does-not-exist".to_string(),
                    technique_id: "T1082".to_string(),
                    success: true,
                    output: String::new(),
                    exit_code: 0,
                    error: String::new(),
                    detection_hint: None,
                },
                "agent-1",
            )
            .await;
    }

    #[tokio::test]
    async fn handle_agent_disconnect_fails_running_tasks_for_that_agent() {
        let (orchestrator, hub, repo) = harness();
        repo.seed_agent(linux_agent("agent-1")).await;
        repo.seed_technique(technique("T1082", "uname -a")).await;
        repo.seed_scenario(scenario("T1082")).await;

        let (session, _outbound_rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("agent-1".to_string()));
        hub.register(session);
        settle().await;

        let execution_id = orchestrator
            .start_execution("scenario-1", vec!["agent-1".to_string()], false)
            .await
            .unwrap();
        settle().await;

        orchestrator.handle_agent_disconnect("agent-1".to_string()).await;
        settle().await;

        let execution = repo.find_execution(&execution_id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.progress.failed, 1);
    }
}
