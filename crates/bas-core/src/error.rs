use thiserror::Error;

/// Failure surface of the repository contracts in §6. The core treats all
/// of these as opaque external failures: persistence itself is out of
/// scope, only the contract is.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend error: {0}")]
    Backend(String),
}
