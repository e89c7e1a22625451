use tokio::sync::broadcast;

use bas_wire::DashboardFrame;

/// Fans out execution-lifecycle events to every subscribed dashboard
/// session. A thin wrapper over a broadcast channel: publishing never
/// blocks, and a subscriber that falls behind only loses events, it never
/// stalls the publisher.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardFrame>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(2048);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardFrame> {
        self.tx.subscribe()
    }

    pub fn publish(&self, frame: DashboardFrame) {
        let _ = self.tx.send(frame);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
