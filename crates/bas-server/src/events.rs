use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use bas_core::EventBus;
use bas_hub::Hub;
use bas_wire::encode_dashboard_frame;

/// Event Publisher (§4.8): subscribes to the orchestrator's lifecycle events
/// and fans each one out to every connected dashboard session, wrapped in
/// the wire envelope. A subscriber that falls behind the broadcast channel's
/// capacity only loses the oldest events it missed; it resubscribes for
/// everything from that point on rather than dying.
pub async fn run(event_bus: Arc<EventBus>, hub: Arc<Hub>) {
    let mut events = event_bus.subscribe();
    loop {
        match events.recv().await {
            Ok(frame) => match encode_dashboard_frame(&frame) {
                Ok(bytes) => hub.broadcast(bytes),
                Err(err) => tracing::error!(error = %err, "failed to encode dashboard frame"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event publisher lagged, dropped lifecycle events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
