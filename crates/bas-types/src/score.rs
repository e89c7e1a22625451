use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreCounts {
    pub blocked: u64,
    pub detected: u64,
    pub successful: u64,
    pub total: u64,
}

/// Computed once, on execution completion. `overall` follows the weighted
/// blocked/detected formula in `bas_scoring::score::calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScore {
    pub overall: f64,
    #[serde(default)]
    pub by_tactic: BTreeMap<String, f64>,
    pub counts: ScoreCounts,
}
