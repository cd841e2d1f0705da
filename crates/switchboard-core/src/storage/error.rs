//! # Switchboard Core Storage System Errors
//!
//! Defines error types specific to the Switchboard Storage System.
//!
//! This module includes [`StorageSystemError`], the enum covering failures
//! of the option store: file I/O, (de)serialization of option documents and
//! site manifests, and unsupported file formats.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format for path: {0}")]
    UnsupportedConfigFormat(PathBuf),

    #[error("Invalid option value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

// Helper for creating Io errors, ensuring path is always included.
impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}
