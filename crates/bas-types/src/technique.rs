use serde::{Deserialize, Serialize};

use crate::agent::Platform;

/// A concrete shell/interpreter invocation belonging to a `Technique`.
///
/// `is_safe` is deliberately `Option<bool>` rather than `bool`: the catalog
/// this is loaded from sometimes sets per-executor safety and sometimes
/// leaves it unset and relies on the technique-level flag instead (see
/// `Technique::is_safe` and `bas_scoring::compat::filter_safe_executors`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Executor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub executor_type: String,
    #[serde(default)]
    pub platform: Option<Platform>,
    pub command: String,
    #[serde(default)]
    pub cleanup: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub elevation_required: bool,
    #[serde(default)]
    pub is_safe: Option<bool>,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Executor {
    /// Display label for logs and plan output: explicit name, or the type tag.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.executor_type.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tactics: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    pub executors: Vec<Executor>,
    #[serde(default)]
    pub is_safe: bool,
}

impl Technique {
    pub fn executor_by_name(&self, name: &str) -> Option<&Executor> {
        self.executors.iter().find(|e| e.label() == name)
    }
}
