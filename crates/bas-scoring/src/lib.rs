//! Pure functions: compatibility validation (`compat`) and the security
//! score calculator (`score`). Neither module talks to the network, a
//! repository, or the clock — they take values and return values, which is
//! what makes them straightforward to test exhaustively.

pub mod compat;
pub mod score;

pub use compat::{compatible_executors, evaluate, filter_safe_executors, CompatibilityVerdict, ScenarioValidationError, validate_scenario};
pub use score::calculate;
