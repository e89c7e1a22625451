use std::time::Duration;

use crate::orchestrator::Orchestrator;

/// Wires the orchestrator into the two things that drive it without a
/// direct caller: the hub's disconnect callback, and the periodic timeout
/// sweep (SPEC_FULL.md §4.6).
pub struct LifecycleManager;

impl LifecycleManager {
    /// Registers `orchestrator` as the hub's disconnect callback and spawns
    /// the background timeout-sweep ticker. Call once, after both the hub
    /// and the orchestrator exist.
    pub async fn spawn(orchestrator: Orchestrator, hub: std::sync::Arc<bas_hub::Hub>, sweep_interval: Duration) {
        let disconnect_orchestrator = orchestrator.clone();
        hub.set_on_agent_disconnect(move |paw| {
            let orchestrator = disconnect_orchestrator.clone();
            tokio::spawn(async move {
                orchestrator.handle_agent_disconnect(paw).await;
            });
        })
        .await;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                orchestrator.sweep_timeouts().await;
            }
        });
    }
}
