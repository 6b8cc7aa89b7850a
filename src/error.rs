//! Error types for sharelog-to-parquet
//!
//! This module defines the error hierarchy for the conversion pipeline:
//! - Share record decode/encode errors
//! - Share-log framing errors
//! - Parquet writer errors
//! - Configuration and CLI errors
//!
//! Record-level errors are recoverable (the record is skipped and the stream
//! continues). Writer I/O errors are not: they end the conversion job.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a conversion job
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Share-log reading errors
    #[error("Share log error: {0}")]
    Sharelog(#[from] SharelogError),

    /// Parquet output errors
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (opening the input, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors decoding or encoding a single share record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// Zero-length buffer handed to the decoder
    #[error("Empty share buffer")]
    EmptyInput,

    /// Leading version tag is not the one this build understands
    #[error("Unsupported share version {found:#010x}")]
    UnsupportedVersion { found: u32 },

    /// Payload could not be decoded
    #[error("Malformed share payload: {reason}")]
    MalformedPayload { reason: String },

    /// Record could not be serialized
    #[error("Share serialization failed: {reason}")]
    SerializationFailure { reason: String },
}

impl ShareError {
    /// Decode-side errors only cost the record they occurred on
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ShareError::SerializationFailure { .. })
    }
}

/// Share-log framing errors
#[derive(Error, Debug)]
pub enum SharelogError {
    /// Underlying read failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream ended inside a frame
    #[error("Truncated frame at offset {offset}: expected {expected} bytes, got {available}")]
    TruncatedFrame {
        offset: u64,
        expected: usize,
        available: usize,
    },

    /// Frame length is implausible, framing can't be trusted past this point
    #[error("Corrupt frame at offset {offset}: length {length} exceeds limit {max}")]
    CorruptFrame { offset: u64, length: u32, max: u32 },

    /// Frame was read but its body did not decode
    #[error("Bad record at offset {offset}: {source}")]
    Record {
        offset: u64,
        #[source]
        source: ShareError,
    },
}

impl SharelogError {
    /// Check if the stream can continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SharelogError::Record { .. } | SharelogError::TruncatedFrame { .. }
        )
    }
}

/// Parquet output errors
#[derive(Error, Debug)]
pub enum ParquetError {
    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet writer error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Append or flush after close
    #[error("Writer for '{path}' is closed")]
    WriterClosed { path: PathBuf },

    /// A previous flush failed; the writer can't continue
    #[error("Writer for '{path}' failed during an earlier flush")]
    WriterFailed { path: PathBuf },

    /// ZSTD level rejected by the codec
    #[error("Invalid ZSTD level {level}: {reason}")]
    InvalidCompressionLevel { level: i32, reason: String },
}

/// Result type alias for ParquetError
pub type ParquetResult<T> = std::result::Result<T, ParquetError>;

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Input share log is missing
    #[error("Input file '{path}' does not exist")]
    InputNotFound { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Row group size out of range
    #[error("Invalid row group size {size}: must be between {min} and {max}")]
    InvalidRowGroupSize { size: usize, min: usize, max: usize },

    /// Compression level out of range
    #[error("Invalid compression level {level}: must be between {min} and {max}")]
    InvalidCompressionLevel { level: i32, min: i32, max: i32 },
}

/// Result type alias for ConvertError
pub type Result<T> = std::result::Result<T, ConvertError>;
