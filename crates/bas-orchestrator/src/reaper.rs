use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use bas_core::AgentRepository;
use bas_hub::Hub;
use bas_types::AgentStatus;

/// Liveness Reaper (SPEC_FULL.md §4.7): periodically marks agents whose
/// `last_seen` has exceeded the stale timeout as offline, and disconnects
/// their hub session through the normal unregister cascade so in-flight
/// tasks fail the same way a mid-task disconnect would.
pub struct Reaper {
    hub: Arc<Hub>,
    agent_repo: Arc<dyn AgentRepository>,
    stale_timeout: chrono::Duration,
    sweep_interval: Duration,
}

impl Reaper {
    pub fn new(
        hub: Arc<Hub>,
        agent_repo: Arc<dyn AgentRepository>,
        stale_timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            hub,
            agent_repo,
            stale_timeout: chrono::Duration::from_std(stale_timeout).unwrap_or(chrono::Duration::seconds(120)),
            sweep_interval,
        }
    }

    pub fn spawn(self) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.sweep_interval);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        });
    }

    async fn sweep(&self) {
        let online = match self.agent_repo.find_by_status(AgentStatus::Online).await {
            Ok(agents) => agents,
            Err(err) => {
                tracing::error!(error = %err, "liveness reaper failed to list online agents");
                return;
            }
        };
        let now = Utc::now();
        for mut agent in online {
            if now - agent.last_seen <= self.stale_timeout {
                continue;
            }
            tracing::warn!(paw = %agent.paw, last_seen = %agent.last_seen, "agent went stale, marking offline");
            agent.status = AgentStatus::Offline;
            if let Err(err) = self.agent_repo.update(agent.clone()).await {
                tracing::error!(paw = %agent.paw, error = %err, "failed to persist stale agent");
                continue;
            }
            self.hub.disconnect_agent(&agent.paw).await;
        }
    }
}
