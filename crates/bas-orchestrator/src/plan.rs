use std::collections::HashMap;

use bas_scoring::compat::{compatible_executors, evaluate, filter_safe_executors};
use bas_types::{Agent, Executor, ExecutionPlan, PlannedTask, Scenario, Technique};
use uuid::Uuid;

use crate::error::PlanError;

/// Builds the totally-ordered task plan for a scenario run (SPEC_FULL.md
/// §4.5). Assumes the scenario has already passed
/// `bas_scoring::compat::validate_scenario` against `techniques` — a missing
/// technique here is still handled defensively, but is not the expected path.
///
/// `target_agents` fixes the agent iteration order within a phase/selection;
/// an agent absent from `agents` (not found, or excluded upstream) is skipped
/// silently, matching the "skip incompatible agents silently" rule.
pub fn build_plan(
    scenario: &Scenario,
    techniques: &HashMap<String, Technique>,
    agents: &HashMap<String, Agent>,
    target_agents: &[String],
    safe_mode: bool,
) -> Result<ExecutionPlan, PlanError> {
    let mut tasks = Vec::new();
    let mut order_index: u64 = 0;

    for phase in scenario.ordered_phases() {
        for selection in &phase.selections {
            let Some(technique) = techniques.get(&selection.technique_id) else {
                return Err(PlanError::UnknownTechnique {
                    scenario: scenario.id.clone(),
                    technique_id: selection.technique_id.clone(),
                });
            };

            let eligible: Vec<&Executor> = if safe_mode {
                filter_safe_executors(technique)
            } else {
                technique.executors.iter().collect()
            };
            if eligible.is_empty() {
                continue;
            }
            let eligible_labels: std::collections::HashSet<&str> =
                eligible.iter().map(|e| e.label()).collect();

            for paw in target_agents {
                let Some(agent) = agents.get(paw) else {
                    continue;
                };
                if !evaluate(agent, technique).valid {
                    continue;
                }

                let eligible_and_compatible: Vec<&Executor> = compatible_executors(agent, technique)
                    .into_iter()
                    .filter(|e| eligible_labels.contains(e.label()))
                    .collect();

                let chosen: Vec<&Executor> = match selection.executor_name() {
                    Some(name) => eligible_and_compatible
                        .into_iter()
                        .filter(|e| e.label() == name)
                        .collect(),
                    None => eligible_and_compatible,
                };

                for executor in chosen {
                    tasks.push(PlannedTask {
                        task_id: Uuid::new_v4().to_string(),
                        technique_id: technique.id.clone(),
                        agent_paw: paw.clone(),
                        phase_order: phase.order,
                        order_index,
                        executor_name: Some(executor.label().to_string()),
                        command: executor.command.clone(),
                        cleanup: executor.cleanup.clone(),
                        timeout_secs: executor.timeout_secs,
                    });
                    order_index += 1;
                }
            }
        }
    }

    if tasks.is_empty() {
        return Err(PlanError::EmptyPlan(scenario.id.clone()));
    }

    Ok(ExecutionPlan {
        id: Uuid::new_v4().to_string(),
        tasks,
    })
}

/// Re-verifies, immediately before dispatch, that every planned task's agent
/// still exists, is online, and remains compatible with its technique. The
/// whole plan is rejected on the first failure (SPEC_FULL.md §4.5).
pub fn validate_plan(
    plan: &ExecutionPlan,
    agents: &HashMap<String, Agent>,
    techniques: &HashMap<String, Technique>,
) -> Result<(), PlanError> {
    for task in &plan.tasks {
        let Some(agent) = agents.get(&task.agent_paw) else {
            return Err(PlanError::AgentUnavailable {
                paw: task.agent_paw.clone(),
                reason: "agent no longer known".to_string(),
            });
        };
        if !agent.is_online() {
            return Err(PlanError::AgentUnavailable {
                paw: task.agent_paw.clone(),
                reason: "agent is not online".to_string(),
            });
        }
        let Some(technique) = techniques.get(&task.technique_id) else {
            return Err(PlanError::AgentUnavailable {
                paw: task.agent_paw.clone(),
                reason: format!("technique {} no longer known", task.technique_id),
            });
        };
        if !evaluate(agent, technique).valid {
            return Err(PlanError::AgentUnavailable {
                paw: task.agent_paw.clone(),
                reason: format!("no longer compatible with technique {}", technique.id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bas_types::{AgentStatus, Phase, Platform, TechniqueSelection};

    fn agent(paw: &str, platform: Platform, executors: &[&str]) -> Agent {
        let mut a = Agent::new(paw, format!("{paw}-host"), platform);
        a.executors = executors.iter().map(|s| s.to_string()).collect();
        a
    }

    fn executor(name: Option<&str>, executor_type: &str, is_safe: Option<bool>) -> Executor {
        Executor {
            name: name.map(|n| n.to_string()),
            executor_type: executor_type.to_string(),
            platform: None,
            command: format!("{executor_type}-command"),
            cleanup: None,
            timeout_secs: 60,
            elevation_required: false,
            is_safe,
        }
    }

    fn scenario_single_phase(technique_id: &str, executor_name: Option<&str>) -> Scenario {
        Scenario {
            id: "s1".to_string(),
            name: "S1".to_string(),
            phases: vec![Phase {
                order: 0,
                selections: vec![TechniqueSelection {
                    technique_id: technique_id.to_string(),
                    executor_name: executor_name.map(|s| s.to_string()),
                }],
            }],
        }
    }

    #[test]
    fn happy_path_single_task() {
        let technique = Technique {
            id: "T1082".to_string(),
            name: "Discovery".to_string(),
            tactics: vec!["discovery".to_string()],
            platforms: vec![Platform::Windows],
            executors: vec![executor(None, "cmd", None)],
            is_safe: true,
        };
        let mut techniques = HashMap::new();
        techniques.insert(technique.id.clone(), technique);
        let mut agents = HashMap::new();
        agents.insert("a1".to_string(), agent("a1", Platform::Windows, &["cmd"]));

        let scenario = scenario_single_phase("T1082", Some(""));
        let plan = build_plan(
            &scenario,
            &techniques,
            &agents,
            &["a1".to_string()],
            false,
        )
        .unwrap();

        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn safe_mode_filters_unsafe_technique() {
        let safe = Technique {
            id: "T1082".to_string(),
            name: "Discovery".to_string(),
            tactics: vec![],
            platforms: vec![Platform::Windows],
            executors: vec![executor(None, "cmd", None)],
            is_safe: true,
        };
        let unsafe_technique = Technique {
            id: "T1055".to_string(),
            name: "Injection".to_string(),
            tactics: vec![],
            platforms: vec![Platform::Windows],
            executors: vec![executor(None, "cmd", None)],
            is_safe: false,
        };
        let mut techniques = HashMap::new();
        techniques.insert(safe.id.clone(), safe);
        techniques.insert(unsafe_technique.id.clone(), unsafe_technique);
        let mut agents = HashMap::new();
        agents.insert("a1".to_string(), agent("a1", Platform::Windows, &["cmd"]));

        let scenario = Scenario {
            id: "s2".to_string(),
            name: "S2".to_string(),
            phases: vec![Phase {
                order: 0,
                selections: vec![
                    TechniqueSelection {
                        technique_id: "T1082".to_string(),
                        executor_name: None,
                    },
                    TechniqueSelection {
                        technique_id: "T1055".to_string(),
                        executor_name: None,
                    },
                ],
            }],
        };

        let plan = build_plan(&scenario, &techniques, &agents, &["a1".to_string()], true).unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].technique_id, "T1082");
    }

    #[test]
    fn no_executor_name_fans_out_one_task_per_compatible_executor() {
        let technique = Technique {
            id: "T1552.001".to_string(),
            name: "Credentials in Files".to_string(),
            tactics: vec![],
            platforms: vec![Platform::Linux],
            executors: vec![
                executor(Some("Find AWS Credentials"), "bash", None),
                executor(Some("Find Github Credentials"), "sh", None),
                executor(Some("Find Azure Credentials"), "bash", None),
            ],
            is_safe: true,
        };
        let mut techniques = HashMap::new();
        techniques.insert(technique.id.clone(), technique);
        let mut agents = HashMap::new();
        agents.insert(
            "linux1".to_string(),
            agent("linux1", Platform::Linux, &["sh", "bash"]),
        );

        let scenario = scenario_single_phase("T1552.001", None);
        let plan = build_plan(
            &scenario,
            &techniques,
            &agents,
            &["linux1".to_string()],
            false,
        )
        .unwrap();

        assert_eq!(plan.tasks.len(), 3);
    }

    #[test]
    fn executor_name_pins_exactly_one_task() {
        let technique = Technique {
            id: "T1552.001".to_string(),
            name: "Credentials in Files".to_string(),
            tactics: vec![],
            platforms: vec![Platform::Linux],
            executors: vec![
                executor(Some("Find AWS Credentials"), "bash", None),
                executor(Some("Find Github Credentials"), "sh", None),
            ],
            is_safe: true,
        };
        let mut techniques = HashMap::new();
        techniques.insert(technique.id.clone(), technique);
        let mut agents = HashMap::new();
        agents.insert(
            "linux1".to_string(),
            agent("linux1", Platform::Linux, &["sh", "bash"]),
        );

        let scenario = scenario_single_phase("T1552.001", Some("Find Github Credentials"));
        let plan = build_plan(
            &scenario,
            &techniques,
            &agents,
            &["linux1".to_string()],
            false,
        )
        .unwrap();

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].command, "sh-command");
    }

    #[test]
    fn empty_plan_is_an_error() {
        let technique = Technique {
            id: "T1082".to_string(),
            name: "Discovery".to_string(),
            tactics: vec![],
            platforms: vec![Platform::Linux],
            executors: vec![executor(None, "bash", None)],
            is_safe: true,
        };
        let mut techniques = HashMap::new();
        techniques.insert(technique.id.clone(), technique);
        // agent is windows, technique only supports linux: nothing compatible.
        let mut agents = HashMap::new();
        agents.insert("a1".to_string(), agent("a1", Platform::Windows, &["cmd"]));

        let scenario = scenario_single_phase("T1082", None);
        let err = build_plan(&scenario, &techniques, &agents, &["a1".to_string()], false)
            .unwrap_err();
        assert!(matches!(err, PlanError::EmptyPlan(_)));
    }

    #[test]
    fn validate_plan_rejects_offline_agent() {
        let technique = Technique {
            id: "T1082".to_string(),
            name: "Discovery".to_string(),
            tactics: vec![],
            platforms: vec![Platform::Windows],
            executors: vec![executor(None, "cmd", None)],
            is_safe: true,
        };
        let mut techniques = HashMap::new();
        techniques.insert(technique.id.clone(), technique);
        let mut offline_agent = agent("a1", Platform::Windows, &["cmd"]);
        offline_agent.status = AgentStatus::Offline;
        let mut agents = HashMap::new();
        agents.insert("a1".to_string(), offline_agent);

        let plan = ExecutionPlan {
            id: "plan-1".to_string(),
            tasks: vec![PlannedTask {
                task_id: "t1".to_string(),
                technique_id: "T1082".to_string(),
                agent_paw: "a1".to_string(),
                phase_order: 0,
                order_index: 0,
                executor_name: Some("cmd".to_string()),
                command: "cmd-command".to_string(),
                cleanup: None,
                timeout_secs: 60,
            }],
        };

        let err = validate_plan(&plan, &agents, &techniques).unwrap_err();
        assert!(matches!(err, PlanError::AgentUnavailable { .. }));
    }
}
