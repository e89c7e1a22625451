use std::sync::Arc;

use bas_core::{AgentRepository, EngineConfig, EventBus, ResultRepository, ScenarioRepository, TechniqueRepository};
use bas_hub::{Hub, SessionConfig};
use bas_orchestrator::Orchestrator;

/// Optional secrets honored at the WebSocket handshake. Checking them here is
/// the narrow slice of authentication this crate owns; the REST layer's full
/// auth/authz middleware is an external collaborator (SPEC §1).
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub agent_key: Option<String>,
    pub dashboard_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub orchestrator: Orchestrator,
    pub event_bus: Arc<EventBus>,
    pub agent_repo: Arc<dyn AgentRepository>,
    pub technique_repo: Arc<dyn TechniqueRepository>,
    pub scenario_repo: Arc<dyn ScenarioRepository>,
    pub result_repo: Arc<dyn ResultRepository>,
    pub config: EngineConfig,
    pub auth: AuthConfig,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hub: Arc<Hub>,
        orchestrator: Orchestrator,
        event_bus: Arc<EventBus>,
        agent_repo: Arc<dyn AgentRepository>,
        technique_repo: Arc<dyn TechniqueRepository>,
        scenario_repo: Arc<dyn ScenarioRepository>,
        result_repo: Arc<dyn ResultRepository>,
        config: EngineConfig,
        auth: AuthConfig,
    ) -> Self {
        Self {
            hub,
            orchestrator,
            event_bus,
            agent_repo,
            technique_repo,
            scenario_repo,
            result_repo,
            config,
            auth,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            pong_wait: self.config.pong_wait,
            write_wait: self.config.write_wait,
            ping_period: self.config.ping_period(),
            max_frame_size_bytes: self.config.max_frame_size_bytes,
            outbound_queue_size: self.config.outbound_queue_size,
        }
    }
}
