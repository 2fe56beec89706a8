//! Error types for the TsFile reading and recovery layer.
//!
//! Distinguishes "this is not a TsFile at all" ([`TsFileError::Incompatible`])
//! from "this is a TsFile but the bytes are damaged"
//! ([`TsFileError::Corruption`]). A missing device or measurement is never an
//! error; lookups return `None`/empty results for those.

use thiserror::Error;

/// Errors that can occur while reading or recovering a TsFile
#[derive(Error, Debug)]
pub enum TsFileError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally malformed bytes (bad marker, truncated record,
    /// offset pointing outside its region)
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Header magic or version mismatch, or file too short to hold a header
    #[error("Incompatible file: {0}")]
    Incompatible(String),

    /// Device time ranges of one file span more than one time partition
    #[error("Data of {file} crosses time partitions {partitions:?}")]
    PartitionViolation {
        /// Path of the offending file
        file: String,
        /// Distinct partition ids observed across the file's devices
        partitions: Vec<i64>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for TsFile operations
pub type TsFileResult<T> = Result<T, TsFileError>;
