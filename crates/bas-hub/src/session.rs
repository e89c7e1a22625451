use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A frame queued for the writer task. `Ping` is injected by the writer's
/// own ticker, never by a caller.
#[derive(Debug)]
pub enum OutboundFrame {
    Data(Vec<u8>),
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Agent,
    Dashboard,
}

/// Called once per decoded frame, with the id of the session it arrived on.
pub type Dispatcher = Arc<dyn Fn(Uuid, Vec<u8>) + Send + Sync>;

/// Everything the Hub needs to route to and identify a live connection.
///
/// Exactly one reader task and one writer task are ever spawned against the
/// underlying socket; this handle is the only way anything else reaches it.
/// The outbound queue is a bounded channel — `send` never blocks, matching
/// the Hub's own `send_to_agent`/`broadcast` contract.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub kind: SessionKind,
    paw: Arc<RwLock<Option<String>>>,
    outbound_tx: mpsc::Sender<OutboundFrame>,
    close: CancellationToken,
}

impl SessionHandle {
    pub async fn paw(&self) -> Option<String> {
        self.paw.read().await.clone()
    }

    pub async fn bind_paw(&self, paw: String) {
        *self.paw.write().await = Some(paw);
    }

    /// Non-blocking offer to the outbound queue. `false` means the queue
    /// was full (or already closed) and the frame was dropped.
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        self.outbound_tx.try_send(OutboundFrame::Data(bytes)).is_ok()
    }

    /// The Hub's exclusive right: closes the outbound queue exactly once.
    /// Idempotent — cancelling an already-cancelled token is a no-op.
    pub fn close(&self) {
        self.close.cancel();
    }

    /// Builds a handle with no socket behind it, for exercising the Hub's
    /// register/unregister/broadcast bookkeeping without a network stack.
    /// Returns the handle plus the receiving half of its outbound queue and
    /// its cancellation token, so a test can observe what the Hub does to it.
    #[cfg(any(test, feature = "test-util"))]
    pub fn for_test(
        id: Uuid,
        kind: SessionKind,
        paw: Option<String>,
    ) -> (Self, mpsc::Receiver<OutboundFrame>, CancellationToken) {
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let close = CancellationToken::new();
        let handle = Self {
            id,
            kind,
            paw: Arc::new(RwLock::new(paw)),
            outbound_tx,
            close: close.clone(),
        };
        (handle, outbound_rx, close)
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }
}

pub struct SessionConfig {
    pub pong_wait: Duration,
    pub write_wait: Duration,
    pub ping_period: Duration,
    pub max_frame_size_bytes: usize,
    pub outbound_queue_size: usize,
}

/// Builds a registered-but-not-yet-spawned session: splits the socket,
/// wires the bounded outbound queue, and returns the handle plus the two
/// futures the caller must spawn as independent tasks.
pub fn new_session(
    id: Uuid,
    kind: SessionKind,
    socket: WebSocket,
    config: &SessionConfig,
    dispatcher: Dispatcher,
    unregister_tx: mpsc::UnboundedSender<Uuid>,
) -> (
    SessionHandle,
    impl std::future::Future<Output = ()>,
    impl std::future::Future<Output = ()>,
) {
    let (sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_size);
    let close = CancellationToken::new();
    let paw = Arc::new(RwLock::new(None));

    let handle = SessionHandle {
        id,
        kind,
        paw: paw.clone(),
        outbound_tx,
        close: close.clone(),
    };

    let writer = run_writer(
        sink,
        outbound_rx,
        close.clone(),
        config.write_wait,
        config.ping_period,
        id,
        unregister_tx.clone(),
    );
    let reader = run_reader(
        stream,
        dispatcher,
        id,
        config.pong_wait,
        config.max_frame_size_bytes,
        unregister_tx,
    );

    (handle, reader, writer)
}

/// Single reader task: enforces the pong-wait read deadline and the max
/// frame size, decodes nothing itself (that's the codec's job one layer
/// up) and hands raw bytes to the dispatcher. Any read error, EOF, close
/// frame, or oversized frame ends the loop and enqueues unregistration.
async fn run_reader(
    mut stream: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    id: Uuid,
    pong_wait: Duration,
    max_frame_size_bytes: usize,
    unregister_tx: mpsc::UnboundedSender<Uuid>,
) {
    loop {
        let next = tokio::time::timeout(pong_wait, stream.next()).await;
        let message = match next {
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(err))) => {
                tracing::debug!(session = %id, error = %err, "session read error");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::debug!(session = %id, "session read deadline exceeded");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if text.len() > max_frame_size_bytes {
                    tracing::warn!(session = %id, size = text.len(), "frame exceeds max size, closing session");
                    break;
                }
                dispatcher(id, text.as_bytes().to_vec());
            }
            Message::Binary(bytes) => {
                if bytes.len() > max_frame_size_bytes {
                    tracing::warn!(session = %id, size = bytes.len(), "frame exceeds max size, closing session");
                    break;
                }
                dispatcher(id, bytes.to_vec());
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    let _ = unregister_tx.send(id);
}

/// Single writer task: drains the outbound queue one frame at a time (not
/// coalesced), falling back to a ping on each ticker fire. Exits and
/// enqueues unregistration on a write error, a closed queue, or
/// cancellation by the Hub.
async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundFrame>,
    close: CancellationToken,
    write_wait: Duration,
    ping_period: Duration,
    id: Uuid,
    unregister_tx: mpsc::UnboundedSender<Uuid>,
) {
    let mut ticker = tokio::time::interval(ping_period);
    ticker.tick().await;

    'outer: loop {
        tokio::select! {
            _ = close.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            received = outbound_rx.recv() => {
                match received {
                    Some(frame) => {
                        if write_frame(&mut sink, frame, write_wait).await.is_err() {
                            break 'outer;
                        }
                        while let Ok(frame) = outbound_rx.try_recv() {
                            if write_frame(&mut sink, frame, write_wait).await.is_err() {
                                break 'outer;
                            }
                        }
                    }
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if write_frame(&mut sink, OutboundFrame::Ping, write_wait).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = unregister_tx.send(id);
}

async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: OutboundFrame,
    write_wait: Duration,
) -> Result<(), ()> {
    let message = match frame {
        OutboundFrame::Data(bytes) => Message::Binary(bytes.into()),
        OutboundFrame::Ping => Message::Ping(Vec::new().into()),
    };
    match tokio::time::timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "session write error");
            Err(())
        }
        Err(_) => {
            tracing::debug!("session write deadline exceeded");
            Err(())
        }
    }
}
