//! Axum wiring for the two external WebSocket endpoints (§6) plus the
//! background machinery that drives the core without a direct caller: the
//! Lifecycle Manager's timeout sweep, the Liveness Reaper, and the Event
//! Publisher. The REST handler layer and its auth/authz middleware are
//! external collaborators this crate never implements (§1) — `AppState`
//! exposes `orchestrator` directly so an embedder (the engine binary today,
//! a REST layer outside this scope tomorrow) can call `start_execution`/
//! `stop` itself.

mod auth;
mod events;
mod state;
mod ws_agent;
mod ws_dashboard;

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bas_orchestrator::{LifecycleManager, Reaper};

pub use state::{AppState, AuthConfig};

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/agent", get(ws_agent::handler))
        .route("/ws/dashboard", get(ws_dashboard::handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr`, spawns every background task the core needs (timeout sweep,
/// liveness reaper, event publisher), and serves until `ctrl_c` or a fatal
/// accept error. All spawned tasks are aborted on the way out.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let sweep_interval = Duration::from_secs(5);
    let reaper_interval = Duration::from_secs(30);

    LifecycleManager::spawn(state.orchestrator.clone(), state.hub.clone(), sweep_interval).await;

    let reaper = Reaper::new(
        state.hub.clone(),
        state.agent_repo.clone(),
        state.config.stale_timeout,
        reaper_interval,
    );
    reaper.spawn();

    let publisher = tokio::spawn(events::run(state.event_bus.clone(), state.hub.clone()));

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "bas-server listening");
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                futures::future::pending::<()>().await;
            }
        })
        .await;
    publisher.abort();
    result?;
    Ok(())
}
