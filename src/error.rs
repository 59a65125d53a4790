//! Error types for colstore
//!
//! Provides a unified error type for engine and infrastructure operations.
//! The administrative layer has its own tagged error in [`crate::admin`].

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for colstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Partition File Errors
    // -------------------------------------------------------------------------
    #[error("Partition corruption detected: {0}")]
    PartitionCorruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Collection Errors
    // -------------------------------------------------------------------------
    #[error("Collection {0} already exists")]
    CollectionExists(String),

    #[error("Collection {0} does not exist")]
    CollectionNotFound(String),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    #[error("Invalid number of partitions: {0}")]
    InvalidPartitionCount(i64),

    // -------------------------------------------------------------------------
    // Document Errors
    // -------------------------------------------------------------------------
    #[error("Document {0} not found")]
    DocumentNotFound(u64),

    #[error("Record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: u32 },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
