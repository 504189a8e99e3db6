//! Error types for docacl
//!
//! Permission denial is never an error here: resolution returns a
//! [`PermissionSet`](crate::PermissionSet) and guards return a
//! [`Decision`](crate::Decision). Errors are reserved for collaborator faults.

use thiserror::Error;

/// The main error type for docacl operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AclError {
    /// The document store failed (open, read, write or query)
    #[error("store: {0}")]
    Store(String),
    /// Configuration could not be loaded or parsed
    #[error("config: {0}")]
    Config(String),
    /// A document that had to exist was missing
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias for docacl operations
pub type Result<T> = std::result::Result<T, AclError>;

/// Convert any collaborator error into a store error
pub fn err<E: std::error::Error>(e: E) -> AclError {
    AclError::Store(e.to_string())
}
