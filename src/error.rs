//! Error types for the pseudobulk pipeline

use thiserror::Error;

/// Main error type for pseudobulk operations
///
/// Three variants carry the pipeline's failure semantics:
/// `InvalidSampleLabel` (unparseable pseudo-sample label, fatal),
/// `MisalignedMetadata` (count matrix / metadata mismatch, fatal) and
/// `MissingContrastGroup` (absent condition for one cell type, local to
/// that cell type's contrast).
#[derive(Error, Debug)]
pub enum PseudobulkError {
    #[error("Invalid sample label '{label}': {reason}")]
    InvalidSampleLabel { label: String, reason: String },

    #[error("Duplicate sample label '{label}'")]
    DuplicateSampleLabel { label: String },

    #[error("Count matrix and metadata are misaligned: {reason}")]
    MisalignedMetadata { reason: String },

    #[error("Contrast group '{group}' has no pseudo-samples")]
    MissingContrastGroup { group: String },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid annotations: {reason}")]
    InvalidAnnotations { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid contrast specification: {reason}")]
    InvalidContrast { reason: String },

    #[error("Size factor estimation failed: {reason}")]
    SizeFactorFailed { reason: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type alias for pseudobulk operations
pub type Result<T> = std::result::Result<T, PseudobulkError>;
