use serde::{Deserialize, Serialize};

/// One technique chosen for a phase, optionally pinned to a named executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueSelection {
    pub technique_id: String,
    #[serde(default)]
    pub executor_name: Option<String>,
}

impl TechniqueSelection {
    pub fn executor_name(&self) -> Option<&str> {
        self.executor_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub order: u32,
    #[serde(default)]
    pub selections: Vec<TechniqueSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl Scenario {
    /// Phases in the order the plan must walk them, regardless of storage order.
    pub fn ordered_phases(&self) -> Vec<&Phase> {
        let mut phases: Vec<&Phase> = self.phases.iter().collect();
        phases.sort_by_key(|p| p.order);
        phases
    }
}
