use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The wire envelope every frame is wrapped in: `{"type": "...", "payload": {...}}`.
///
/// This is the only shape the codec trusts before it knows what kind of
/// frame it is holding; known types are decoded into the structs in
/// `agent`, `server`, and `dashboard`, everything else stays an `Envelope`
/// with an opaque `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(frame_type: impl Into<String>, payload: Value) -> Self {
        Self {
            frame_type: frame_type.into(),
            payload,
        }
    }
}
