//! # Switchboard Core Kernel Errors
//!
//! Defines the top-level error type for the Switchboard framework.
//!
//! [`Error`] wraps the typed errors of each subsystem
//! ([`ModuleSystemError`] and [`StorageSystemError`]) so that public
//! entry points on the [`Framework`](crate::kernel::Framework) can return a
//! single [`Result`] type.
use std::path::PathBuf;
use std::result::Result as StdResult;

use crate::module_system::error::ModuleSystemError;
use crate::storage::error::StorageSystemError;
use thiserror::Error as ThisError;

/// Custom error type for the Switchboard framework
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed module system error
    #[error("Module system error: {0}")]
    ModuleSystem(#[from] ModuleSystemError),

    /// Specific, typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

// Helper to create an I/O error with context, wrapping StorageSystemError::Io
impl Error {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }
}
