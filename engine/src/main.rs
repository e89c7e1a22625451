use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use bas_core::{testing::InMemoryRepositories, EngineConfig, EventBus};
use bas_hub::Hub;
use bas_orchestrator::Orchestrator;
use bas_server::{serve, AppState, AuthConfig};

/// Every named option from SPEC §6's Configuration list, settable as a flag
/// or its matching `BAS_*` environment variable, overlaying `EngineConfig`'s
/// defaults.
#[derive(Parser, Debug)]
#[command(name = "bas-engine")]
#[command(about = "Breach-and-attack-simulation control plane")]
struct Cli {
    #[arg(long, env = "BAS_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "BAS_PORT", default_value_t = 7070)]
    port: u16,

    #[arg(long, env = "BAS_HEARTBEAT_INTERVAL_SECS", default_value_t = 30)]
    heartbeat_interval_secs: u64,
    #[arg(long, env = "BAS_STALE_TIMEOUT_SECS", default_value_t = 120)]
    stale_timeout_secs: u64,
    #[arg(long, env = "BAS_WRITE_WAIT_SECS", default_value_t = 10)]
    write_wait_secs: u64,
    #[arg(long, env = "BAS_PONG_WAIT_SECS", default_value_t = 60)]
    pong_wait_secs: u64,
    #[arg(long, env = "BAS_MAX_FRAME_SIZE_BYTES", default_value_t = bas_wire::MAX_FRAME_SIZE_BYTES)]
    max_frame_size_bytes: usize,
    #[arg(long, env = "BAS_DEFAULT_TASK_TIMEOUT_SECS", default_value_t = 300)]
    default_task_timeout_secs: u64,
    #[arg(long, env = "BAS_OUTBOUND_QUEUE_SIZE", default_value_t = 256)]
    outbound_queue_size: usize,
    /// Unbounded fan-out within a phase when unset, matching the spec's default.
    #[arg(long, env = "BAS_DISPATCH_CONCURRENCY")]
    dispatch_concurrency: Option<usize>,
    #[arg(long, env = "BAS_SAFE_MODE_DEFAULT", default_value_t = false)]
    safe_mode_default: bool,

    /// Checked against the agent handshake's `X-Agent-Key` header; unset accepts any agent.
    #[arg(long, env = "BAS_AGENT_KEY")]
    agent_key: Option<String>,
    /// Checked against the dashboard handshake's bearer token; unset accepts any dashboard.
    #[arg(long, env = "BAS_DASHBOARD_TOKEN")]
    dashboard_token: Option<String>,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            stale_timeout: Duration::from_secs(self.stale_timeout_secs),
            write_wait: Duration::from_secs(self.write_wait_secs),
            pong_wait: Duration::from_secs(self.pong_wait_secs),
            max_frame_size_bytes: self.max_frame_size_bytes,
            default_task_timeout: Duration::from_secs(self.default_task_timeout_secs),
            outbound_queue_size: self.outbound_queue_size,
            dispatch_concurrency: self.dispatch_concurrency,
            safe_mode_default: self.safe_mode_default,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config();
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .context("invalid host or port")?;

    // Persistence is an external collaborator the core only reaches through
    // the repository traits (SPEC §1/§6); no production adapter ships here.
    // `InMemoryRepositories` is the one concrete implementation the core
    // provides, and stands in for it until a real adapter is wired in.
    let repos = Arc::new(InMemoryRepositories::new());
    let hub = Arc::new(Hub::new());
    let event_bus = Arc::new(EventBus::new());
    let orchestrator = Orchestrator::new(
        hub.clone(),
        event_bus.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        config.clone(),
    );

    let auth = AuthConfig {
        agent_key: cli.agent_key.clone(),
        dashboard_token: cli.dashboard_token.clone(),
    };
    let state = AppState::new(
        hub,
        orchestrator,
        event_bus,
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos,
        config,
        auth,
    );

    info!(%addr, "starting bas-engine");
    serve(addr, state).await
}
