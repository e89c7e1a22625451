use bas_types::{Agent, Executor, Scenario, Technique};

/// Structured result of checking whether an agent can run a technique.
/// `valid == false` iff platform or executor compatibility fails; warnings
/// never flip `valid` and exist only to surface soft concerns to an
/// operator (agent currently offline, technique marked unsafe).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityVerdict {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn executor_matches(executor: &Executor, agent: &Agent) -> bool {
    agent.executors.contains(&executor.executor_type)
        && executor
            .platform
            .map(|p| p == agent.platform)
            .unwrap_or(true)
}

/// The compatible executors for an agent on a technique, in catalog order.
/// Shared by the validator (existence check) and the orchestrator's plan
/// construction (executor selection).
pub fn compatible_executors<'a>(agent: &Agent, technique: &'a Technique) -> Vec<&'a Executor> {
    technique
        .executors
        .iter()
        .filter(|e| executor_matches(e, agent))
        .collect()
}

/// Evaluates `Validator.valid(A,T) == true` iff there exists an executor
/// `e` on `T` with `e.type` in `A`'s capabilities and `e.platform` empty or
/// equal to `A`'s platform, and `A`'s platform is among `T`'s platforms.
pub fn evaluate(agent: &Agent, technique: &Technique) -> CompatibilityVerdict {
    let mut verdict = CompatibilityVerdict {
        valid: true,
        ..Default::default()
    };

    if !technique.platforms.contains(&agent.platform) {
        verdict.valid = false;
        verdict.errors.push(format!(
            "agent platform {} not supported by technique {}",
            agent.platform.as_str(),
            technique.id
        ));
    }

    if compatible_executors(agent, technique).is_empty() {
        verdict.valid = false;
        verdict.errors.push(format!(
            "no executor on technique {} matches agent {}'s capabilities",
            technique.id, agent.paw
        ));
    }

    if !agent.is_online() {
        verdict
            .warnings
            .push(format!("agent {} is not currently online", agent.paw));
    }

    if !technique.is_safe {
        verdict
            .warnings
            .push(format!("technique {} is marked unsafe", technique.id));
    }

    verdict
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScenarioValidationError {
    #[error("scenario {0} has no phases")]
    EmptyPhases(String),
    #[error("scenario {scenario} references unknown technique {technique_id}")]
    UnknownTechnique {
        scenario: String,
        technique_id: String,
    },
}

/// Validates a whole scenario against the technique catalog: every phase
/// must be non-empty and every referenced technique id must resolve.
pub fn validate_scenario(
    scenario: &Scenario,
    techniques: &std::collections::HashMap<String, Technique>,
) -> Result<(), ScenarioValidationError> {
    if scenario.phases.is_empty() {
        return Err(ScenarioValidationError::EmptyPhases(scenario.id.clone()));
    }
    for phase in &scenario.phases {
        for selection in &phase.selections {
            if !techniques.contains_key(&selection.technique_id) {
                return Err(ScenarioValidationError::UnknownTechnique {
                    scenario: scenario.id.clone(),
                    technique_id: selection.technique_id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Safe-mode executor filtering (SPEC_FULL.md §9, open question #2): when
/// any executor on the technique sets `is_safe`, that per-executor flag is
/// authoritative. Only when none of them set it does the technique-level
/// `is_safe` flag decide, in which case `is_safe=true` keeps every executor
/// eligible — preserved for backward compatibility with callers that only
/// ever set the technique-level flag.
pub fn filter_safe_executors(technique: &Technique) -> Vec<&Executor> {
    let any_per_executor_flag = technique.executors.iter().any(|e| e.is_safe.is_some());
    if any_per_executor_flag {
        technique
            .executors
            .iter()
            .filter(|e| e.is_safe == Some(true))
            .collect()
    } else if technique.is_safe {
        technique.executors.iter().collect()
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bas_types::Platform;

    fn agent(platform: Platform, executors: &[&str]) -> Agent {
        let mut agent = Agent::new("a1", "host-1", platform);
        agent.executors = executors.iter().map(|s| s.to_string()).collect();
        agent
    }

    fn technique(platforms: Vec<Platform>, executors: Vec<Executor>, is_safe: bool) -> Technique {
        Technique {
            id: "T1082".to_string(),
            name: "System Information Discovery".to_string(),
            tactics: vec!["discovery".to_string()],
            platforms,
            executors,
            is_safe,
        }
    }

    fn executor(executor_type: &str, platform: Option<Platform>, is_safe: Option<bool>) -> Executor {
        Executor {
            name: None,
            executor_type: executor_type.to_string(),
            platform,
            command: "systeminfo".to_string(),
            cleanup: None,
            timeout_secs: 60,
            elevation_required: false,
            is_safe,
        }
    }

    #[test]
    fn valid_when_platform_and_executor_match() {
        let a = agent(Platform::Windows, &["cmd"]);
        let t = technique(
            vec![Platform::Windows, Platform::Linux],
            vec![executor("cmd", None, None)],
            true,
        );
        let verdict = evaluate(&a, &t);
        assert!(verdict.valid);
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn invalid_on_platform_mismatch() {
        let a = agent(Platform::Darwin, &["zsh"]);
        let t = technique(vec![Platform::Windows], vec![executor("cmd", None, None)], true);
        let verdict = evaluate(&a, &t);
        assert!(!verdict.valid);
        assert_eq!(verdict.errors.len(), 2); // platform mismatch AND no compatible executor
    }

    #[test]
    fn invalid_when_no_executor_type_matches() {
        let a = agent(Platform::Windows, &["psh"]);
        let t = technique(vec![Platform::Windows], vec![executor("cmd", None, None)], true);
        let verdict = evaluate(&a, &t);
        assert!(!verdict.valid);
    }

    #[test]
    fn executor_platform_restriction_is_honored() {
        let a = agent(Platform::Linux, &["bash"]);
        let t = technique(
            vec![Platform::Linux],
            vec![executor("bash", Some(Platform::Windows), None)],
            true,
        );
        let verdict = evaluate(&a, &t);
        assert!(!verdict.valid);
    }

    #[test]
    fn warns_when_agent_offline_or_technique_unsafe() {
        let mut a = agent(Platform::Windows, &["cmd"]);
        a.status = bas_types::AgentStatus::Offline;
        let t = technique(vec![Platform::Windows], vec![executor("cmd", None, None)], false);
        let verdict = evaluate(&a, &t);
        assert!(verdict.valid);
        assert_eq!(verdict.warnings.len(), 2);
    }

    #[test]
    fn safe_mode_filter_prefers_per_executor_flag() {
        let t = technique(
            vec![Platform::Windows],
            vec![
                executor("cmd", None, Some(true)),
                executor("psh", None, Some(false)),
            ],
            false,
        );
        let safe = filter_safe_executors(&t);
        assert_eq!(safe.len(), 1);
        assert_eq!(safe[0].executor_type, "cmd");
    }

    #[test]
    fn safe_mode_filter_falls_back_to_technique_flag() {
        let t = technique(
            vec![Platform::Windows],
            vec![executor("cmd", None, None), executor("psh", None, None)],
            true,
        );
        let safe = filter_safe_executors(&t);
        assert_eq!(safe.len(), 2);
    }

    #[test]
    fn safe_mode_filter_excludes_everything_when_neither_flag_set() {
        let t = technique(
            vec![Platform::Windows],
            vec![executor("cmd", None, None)],
            false,
        );
        assert!(filter_safe_executors(&t).is_empty());
    }
}
