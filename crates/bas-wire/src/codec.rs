use thiserror::Error;

use crate::agent::{
    AgentFrame, HeartbeatPayload, RegisterPayload, TaskResultPayload, TYPE_HEARTBEAT,
    TYPE_REGISTER, TYPE_TASK_RESULT,
};
use crate::dashboard::{
    DashboardFrame, ExecutionEventPayload, TYPE_EXECUTION_CANCELLED, TYPE_EXECUTION_COMPLETED,
    TYPE_EXECUTION_STARTED,
};
use crate::envelope::Envelope;
use crate::server::{
    RegisteredPayload, ServerFrame, TaskAckPayload, TaskPayload, TYPE_REGISTERED, TYPE_TASK,
    TYPE_TASK_ACK,
};

/// Maximum frame size accepted on the wire before the session that sent it
/// is treated as disconnected (see `bas_hub::session`).
pub const MAX_FRAME_SIZE_BYTES: usize = 512 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),
    #[error("schema mismatch for frame type {frame_type}: {source}")]
    SchemaMismatch {
        frame_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },
}

fn schema_mismatch(frame_type: &str, err: serde_json::Error) -> CodecError {
    CodecError::SchemaMismatch {
        frame_type: frame_type.to_string(),
        source: err,
    }
}

/// Decodes one raw frame received from an agent connection.
///
/// A malformed envelope is `CodecError::MalformedFrame`; the caller logs and
/// skips it without tearing down the session. A recognized type whose
/// payload doesn't match its schema is `CodecError::SchemaMismatch`, handled
/// the same way. An unrecognized type decodes successfully as
/// `AgentFrame::Unknown` so callers can log-and-ignore per §4.3.
pub fn decode_agent_frame(bytes: &[u8]) -> Result<AgentFrame, CodecError> {
    if bytes.len() > MAX_FRAME_SIZE_BYTES {
        return Err(CodecError::FrameTooLarge {
            size: bytes.len(),
            limit: MAX_FRAME_SIZE_BYTES,
        });
    }
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    match envelope.frame_type.as_str() {
        TYPE_REGISTER => {
            let payload: RegisterPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_REGISTER, e))?;
            Ok(AgentFrame::Register(payload))
        }
        TYPE_HEARTBEAT => {
            let payload: HeartbeatPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_HEARTBEAT, e))?;
            Ok(AgentFrame::Heartbeat(payload))
        }
        TYPE_TASK_RESULT => {
            let payload: TaskResultPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_TASK_RESULT, e))?;
            Ok(AgentFrame::TaskResult(payload))
        }
        other => Ok(AgentFrame::Unknown(other.to_string(), envelope.payload)),
    }
}

pub fn encode_server_frame(frame: &ServerFrame) -> Result<Vec<u8>, CodecError> {
    let envelope = match frame {
        ServerFrame::Registered(p) => Envelope::new(TYPE_REGISTERED, serde_json::to_value(p)?),
        ServerFrame::Task(p) => Envelope::new(TYPE_TASK, serde_json::to_value(p)?),
        ServerFrame::TaskAck(p) => Envelope::new(TYPE_TASK_ACK, serde_json::to_value(p)?),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

pub fn decode_server_frame(bytes: &[u8]) -> Result<Option<ServerFrame>, CodecError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    let frame = match envelope.frame_type.as_str() {
        TYPE_REGISTERED => {
            let payload: RegisteredPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_REGISTERED, e))?;
            Some(ServerFrame::Registered(payload))
        }
        TYPE_TASK => {
            let payload: TaskPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_TASK, e))?;
            Some(ServerFrame::Task(payload))
        }
        TYPE_TASK_ACK => {
            let payload: TaskAckPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_TASK_ACK, e))?;
            Some(ServerFrame::TaskAck(payload))
        }
        _ => None,
    };
    Ok(frame)
}

pub fn encode_dashboard_frame(frame: &DashboardFrame) -> Result<Vec<u8>, CodecError> {
    let envelope = match frame {
        DashboardFrame::ExecutionStarted(p) => {
            Envelope::new(TYPE_EXECUTION_STARTED, serde_json::to_value(p)?)
        }
        DashboardFrame::ExecutionCompleted(p) => {
            Envelope::new(TYPE_EXECUTION_COMPLETED, serde_json::to_value(p)?)
        }
        DashboardFrame::ExecutionCancelled(p) => {
            Envelope::new(TYPE_EXECUTION_CANCELLED, serde_json::to_value(p)?)
        }
    };
    Ok(serde_json::to_vec(&envelope)?)
}

pub fn decode_dashboard_frame(bytes: &[u8]) -> Result<Option<DashboardFrame>, CodecError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    let frame = match envelope.frame_type.as_str() {
        TYPE_EXECUTION_STARTED => {
            let payload: ExecutionEventPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_EXECUTION_STARTED, e))?;
            Some(DashboardFrame::ExecutionStarted(payload))
        }
        TYPE_EXECUTION_COMPLETED => {
            let payload: ExecutionEventPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_EXECUTION_COMPLETED, e))?;
            Some(DashboardFrame::ExecutionCompleted(payload))
        }
        TYPE_EXECUTION_CANCELLED => {
            let payload: ExecutionEventPayload = serde_json::from_value(envelope.payload)
                .map_err(|e| schema_mismatch(TYPE_EXECUTION_CANCELLED, e))?;
            Some(DashboardFrame::ExecutionCancelled(payload))
        }
        _ => None,
    };
    Ok(frame)
}
