use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Linux,
    Darwin,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
    Busy,
    Untrusted,
}

/// A remotely deployed agent identified by its stable `paw`.
///
/// `paw` is the only identity that matters to the core: the hub deduplicates
/// sessions by paw and the repository layer is keyed by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub paw: String,
    pub hostname: String,
    #[serde(default)]
    pub username: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub executors: BTreeSet<String>,
    pub status: AgentStatus,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Agent {
    pub fn new(paw: impl Into<String>, hostname: impl Into<String>, platform: Platform) -> Self {
        Self {
            paw: paw.into(),
            hostname: hostname.into(),
            username: None,
            platform,
            executors: BTreeSet::new(),
            status: AgentStatus::Online,
            last_seen: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == AgentStatus::Online
    }
}
