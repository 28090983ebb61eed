//! Error types for clogwatch
//!
//! Every fatal condition of the pipeline is a typed value here. Nothing is
//! logged-and-continued: stages return these and the caller decides.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for clogwatch operations
pub type Result<T> = std::result::Result<T, ClogError>;

/// Main error type for clogwatch operations
#[derive(Error, Debug)]
pub enum ClogError {
    /// Feature schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Raw data format error
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Artifact persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Model fit/predict or scoring error
    #[error("Computation error: {0}")]
    Computation(#[from] ComputationError),

    /// Too few rows left after cleaning to build a single window
    #[error("Insufficient data: {rows} rows after cleaning, need at least {required}")]
    InsufficientData { rows: usize, required: usize },
}

/// Errors about the named feature set
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A required sensor channel is absent from the data
    #[error("Missing required feature: {0}")]
    MissingFeature(String),

    /// The series was scaled with a scaler fitted on another feature set
    #[error("Scaler fitted for schema {expected:016x}, series has {actual:016x}; refit required")]
    ScalerMismatch { expected: u64, actual: u64 },

    /// Number of values in a row does not match the channel list
    #[error("Row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Same channel listed twice
    #[error("Feature listed twice: {0}")]
    DuplicateFeature(String),

    /// Schema without features
    #[error("Feature schema is empty")]
    Empty,
}

/// Errors while reading raw sensor exports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// File extension the loader cannot read
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// CSV structure problem
    #[error("Malformed CSV at line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },

    /// Unparseable timestamp
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Unparseable reading
    #[error("Invalid value '{value}' for {channel}")]
    InvalidValue { channel: String, value: String },

    /// Two rows share a timestamp
    #[error("Duplicate timestamp {0}")]
    DuplicateTimestamp(String),

    /// No usable header line found
    #[error("No header found")]
    MissingHeader,
}

/// Errors from the artifact store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No artifact persisted under this key
    #[error("No {kind} artifact for configuration key '{key}'")]
    NotFound { kind: String, key: String },

    /// Filesystem failure
    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// Stored bytes fail validation
    #[error("Corrupt artifact '{name}': {reason}")]
    Corrupt { name: String, reason: String },
}

/// Errors inside model fitting, prediction and scoring
#[derive(Error, Debug)]
pub enum ComputationError {
    /// Array shapes disagree
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// NaN or infinity produced or received
    #[error("Non-finite value in {stage}")]
    NonFinite { stage: String },

    /// Configuration value cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure inside the model with its underlying cause
    #[error("Model failure: {message}")]
    Model {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
