//! Connection hub and per-connection session lifecycle.
//!
//! [`Hub`] is the single source of truth for which agents and dashboards are
//! currently connected. [`session`] owns the reader/writer task split that
//! gives each connection its liveness (ping/pong) and outbound queueing
//! behaviour; it knows nothing about the wire protocol itself, only bytes.

pub mod hub;
pub mod session;

pub use hub::Hub;
pub use session::{new_session, Dispatcher, OutboundFrame, SessionConfig, SessionHandle, SessionKind};
