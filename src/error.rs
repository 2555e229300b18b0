//! Error types for contract resolution and binding.

use thiserror::Error;

/// Result type for binding operations.
pub type BindResult<T> = Result<T, BindError>;

/// Errors attached to a single contract record. Nothing here is fatal to the
/// rest of the selection: the scope manager and declaration synthesizer skip
/// records whose binding failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    /// The explorer has no verified source for this address.
    #[error("No implementation found")]
    NotVerified,

    /// Fetched or pasted interface text is not a valid ABI.
    #[error("Invalid ABI: {0}")]
    Parse(String),

    /// Transport-level failure talking to the chain indexing API.
    #[error("Network error: {0}")]
    Network(String),

    /// The requested variable name is already bound by another record.
    #[error("Variable name \"{0}\" is already in use")]
    NameCollision(String),

    /// Constructing the callable wrapper failed (malformed entry, unsupported type).
    #[error("Failed to bind contract: {0}")]
    Construction(String),
}
