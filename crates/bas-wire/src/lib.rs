//! The `{type, payload}` envelope and the message schemas carried inside it
//! for the agent protocol (`/ws/agent`) and the dashboard protocol
//! (`/ws/dashboard`).

mod agent;
mod codec;
mod dashboard;
mod envelope;
mod server;

pub use agent::{
    AgentFrame, DetectionHint, HeartbeatPayload, RegisterPayload, TaskResultPayload,
    TYPE_HEARTBEAT, TYPE_REGISTER, TYPE_TASK_RESULT,
};
pub use codec::{
    decode_agent_frame, decode_dashboard_frame, decode_server_frame, encode_dashboard_frame,
    encode_server_frame, CodecError, MAX_FRAME_SIZE_BYTES,
};
pub use dashboard::{
    DashboardFrame, ExecutionEventPayload, TYPE_EXECUTION_CANCELLED, TYPE_EXECUTION_COMPLETED,
    TYPE_EXECUTION_STARTED,
};
pub use envelope::Envelope;
pub use server::{
    RegisteredPayload, ServerFrame, TaskAckPayload, TaskPayload, TYPE_REGISTERED, TYPE_TASK,
    TYPE_TASK_ACK,
};
