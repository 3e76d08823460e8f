//! Error types for playlist parsing and mutation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    /// Malformed raw entry encountered during normalization.
    #[error("invalid playlist entry: {0}")]
    InvalidFormat(String),
    /// The root group cannot be removed from itself.
    #[error("cannot remove the root group from itself")]
    CannotRemoveRoot,
    /// Operation requires a parent group but the entry has none.
    #[error("entry has no parent group")]
    NoParent,
}
