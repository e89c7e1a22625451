use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::session::SessionHandle;

type DisconnectCallback = Arc<dyn Fn(String) + Send + Sync>;

enum HubMessage {
    Register(SessionHandle),
    Unregister(Uuid),
    Broadcast(Vec<u8>),
}

#[derive(Default)]
struct HubState {
    clients: HashMap<Uuid, SessionHandle>,
    agents: HashMap<String, Uuid>,
}

/// Owns the authoritative view of who's connected. A single coordinator
/// task consumes `register`/`unregister`/`broadcast` and is the only thing
/// that ever mutates `HubState`; everything else either sends on those
/// channels or takes a read lock for a point-in-time snapshot.
pub struct Hub {
    state: Arc<RwLock<HubState>>,
    command_tx: mpsc::UnboundedSender<HubMessage>,
    on_disconnect: Arc<RwLock<Option<DisconnectCallback>>>,
}

impl Hub {
    pub fn new() -> Self {
        let state = Arc::new(RwLock::new(HubState::default()));
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<HubMessage>();
        let on_disconnect: Arc<RwLock<Option<DisconnectCallback>>> = Arc::new(RwLock::new(None));

        let coordinator_state = state.clone();
        let coordinator_on_disconnect = on_disconnect.clone();
        tokio::spawn(async move {
            while let Some(message) = command_rx.recv().await {
                match message {
                    HubMessage::Register(session) => {
                        let mut guard = coordinator_state.write().await;
                        if let Some(paw) = session.paw().await {
                            if let Some(previous_id) = guard.agents.insert(paw, session.id) {
                                if let Some(previous) = guard.clients.get(&previous_id) {
                                    previous.close();
                                }
                                guard.clients.remove(&previous_id);
                            }
                        }
                        guard.clients.insert(session.id, session);
                    }
                    HubMessage::Unregister(id) => {
                        let fired = {
                            let mut guard = coordinator_state.write().await;
                            let Some(session) = guard.clients.remove(&id) else {
                                continue;
                            };
                            let session_paw = session.paw().await;
                            if let Some(paw) = &session_paw {
                                // Only drop the agents-map entry if it still
                                // points at this session: a newer session may
                                // already have replaced it.
                                if guard.agents.get(paw) == Some(&id) {
                                    guard.agents.remove(paw);
                                    session_paw
                                } else {
                                    None
                                }
                            } else {
                                None
                            }
                        };
                        if let Some(paw) = fired {
                            if let Some(callback) = coordinator_on_disconnect.read().await.clone() {
                                callback(paw);
                            }
                        }
                    }
                    HubMessage::Broadcast(bytes) => {
                        let guard = coordinator_state.read().await;
                        for session in guard.clients.values() {
                            session.send(bytes.clone());
                        }
                    }
                }
            }
        });

        Self {
            state,
            command_tx,
            on_disconnect,
        }
    }

    pub fn register(&self, session: SessionHandle) {
        let _ = self.command_tx.send(HubMessage::Register(session));
    }

    pub fn unregister(&self, session_id: Uuid) {
        let _ = self.command_tx.send(HubMessage::Unregister(session_id));
    }

    /// Enqueues `bytes` to every currently connected session's outbound
    /// queue. A session whose queue is full silently drops the frame; the
    /// session itself is never evicted for it.
    pub fn broadcast(&self, bytes: Vec<u8>) {
        let _ = self.command_tx.send(HubMessage::Broadcast(bytes));
    }

    /// `false` if no session is currently bound to `paw`, or its queue was
    /// full. Never blocks.
    pub async fn send_to_agent(&self, paw: &str, bytes: Vec<u8>) -> bool {
        let guard = self.state.read().await;
        let Some(id) = guard.agents.get(paw) else {
            return false;
        };
        match guard.clients.get(id) {
            Some(session) => session.send(bytes),
            None => false,
        }
    }

    pub async fn connected_agents(&self) -> Vec<String> {
        let guard = self.state.read().await;
        guard.agents.keys().cloned().collect()
    }

    pub async fn is_agent_connected(&self, paw: &str) -> bool {
        self.state.read().await.agents.contains_key(paw)
    }

    /// Closes the session currently bound to `paw`, if any. This only signals
    /// the close — the coordinator removes it from the maps and fires the
    /// disconnect callback once the session's reader/writer actually exit and
    /// enqueue unregistration, same as any other disconnect.
    pub async fn disconnect_agent(&self, paw: &str) {
        let guard = self.state.read().await;
        if let Some(id) = guard.agents.get(paw) {
            if let Some(session) = guard.clients.get(id) {
                session.close();
            }
        }
    }

    /// Invoked exactly once per paw that transitions from connected to
    /// disconnected, outside the state lock. Replacing a stale session (the
    /// reader/writer of a session that's already been superseded in the
    /// agents map exiting late) never fires this.
    pub async fn set_on_agent_disconnect<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *self.on_disconnect.write().await = Some(Arc::new(callback));
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    // Coordinator messages are delivered over an unbounded channel and
    // processed by a background task; give it a beat to catch up before
    // asserting on state.
    async fn settle() {
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn register_binds_agent_paw() {
        let hub = Hub::new();
        let (session, _rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        hub.register(session);
        settle().await;

        assert!(hub.is_agent_connected("paw-1").await);
        assert_eq!(hub.connected_agents().await, vec!["paw-1".to_string()]);
    }

    #[tokio::test]
    async fn registering_same_paw_closes_prior_session() {
        let hub = Hub::new();
        let (first, _rx1, close1) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        hub.register(first);
        settle().await;

        let (second, _rx2, _close2) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        let second_id = second.id;
        hub.register(second);
        settle().await;

        assert!(close1.is_cancelled());
        assert!(hub.is_agent_connected("paw-1").await);
        let guard = hub.state.read().await;
        assert_eq!(guard.agents.get("paw-1"), Some(&second_id));
    }

    #[tokio::test]
    async fn unregister_of_stale_session_does_not_evict_replacement() {
        let hub = Hub::new();
        let (first, _rx1, _close1) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        let first_id = first.id;
        hub.register(first);
        settle().await;

        let (second, _rx2, _close2) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        hub.register(second);
        settle().await;

        // The first session's reader/writer eventually notices its close
        // token fired and enqueues its own (now stale) unregistration.
        hub.unregister(first_id);
        settle().await;

        assert!(hub.is_agent_connected("paw-1").await);
    }

    #[tokio::test]
    async fn disconnect_callback_fires_once_on_real_unregister() {
        let hub = Hub::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        hub.set_on_agent_disconnect(move |_paw| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        let (session, _rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        let id = session.id;
        hub.register(session);
        settle().await;

        hub.unregister(id);
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!hub.is_agent_connected("paw-1").await);
    }

    #[tokio::test]
    async fn disconnect_callback_does_not_fire_for_replaced_stale_session() {
        let hub = Hub::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        hub.set_on_agent_disconnect(move |_paw| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        let (first, _rx1, _close1) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        let first_id = first.id;
        hub.register(first);
        settle().await;

        let (second, _rx2, _close2) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        hub.register(second);
        settle().await;

        // The stale session's own teardown still enqueues an unregister for
        // its id; it must be a no-op since the agents map no longer points
        // at it.
        hub.unregister(first_id);
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_to_agent_is_false_when_not_connected() {
        let hub = Hub::new();
        assert!(!hub.send_to_agent("nobody", vec![1]).await);
    }

    #[tokio::test]
    async fn send_to_agent_delivers_to_the_bound_session() {
        let hub = Hub::new();
        let (session, mut rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Agent, Some("paw-1".into()));
        hub.register(session);
        settle().await;

        assert!(hub.send_to_agent("paw-1", vec![9, 9]).await);
        let frame = rx.recv().await.expect("frame delivered");
        match frame {
            OutboundFrame::Data(bytes) => assert_eq!(bytes, vec![9, 9]),
            OutboundFrame::Ping => panic!("expected data frame"),
        }
    }

    #[tokio::test]
    async fn broadcast_drops_silently_on_a_full_queue_without_evicting() {
        let hub = Hub::new();
        let (session, mut rx, _close) =
            SessionHandle::for_test(Uuid::new_v4(), SessionKind::Dashboard, None);
        hub.register(session);
        settle().await;

        for _ in 0..32 {
            hub.broadcast(vec![1]);
        }
        settle().await;

        // The queue (capacity 16 in for_test) is full; the session is still
        // registered and some frames made it through.
        assert!(rx.recv().await.is_some());
        let guard = hub.state.read().await;
        assert_eq!(guard.clients.len(), 1);
    }
}
