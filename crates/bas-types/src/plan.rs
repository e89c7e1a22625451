use serde::{Deserialize, Serialize};

/// A fully resolved unit of work: agent, technique, chosen executor, command
/// — before dispatch. Transient; never persisted on its own (only the
/// `ExecutionResult` rows it produces are).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Correlates this task with the `task` frame sent to the agent and the
    /// `task_result` frame the agent eventually returns.
    pub task_id: String,
    pub technique_id: String,
    pub agent_paw: String,
    pub phase_order: u32,
    /// Monotonic position of this task within the whole plan.
    pub order_index: u64,
    pub executor_name: Option<String>,
    pub command: String,
    pub cleanup: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub tasks: Vec<PlannedTask>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks belonging to a given phase, in plan order.
    pub fn tasks_in_phase(&self, phase_order: u32) -> impl Iterator<Item = &PlannedTask> {
        self.tasks
            .iter()
            .filter(move |t| t.phase_order == phase_order)
    }

    /// The distinct phase orders present in the plan, ascending.
    pub fn phase_orders(&self) -> Vec<u32> {
        let mut orders: Vec<u32> = self.tasks.iter().map(|t| t.phase_order).collect();
        orders.sort_unstable();
        orders.dedup();
        orders
    }
}
