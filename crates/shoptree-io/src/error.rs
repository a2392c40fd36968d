//! I/O error types for shoptree-io.

use std::path::PathBuf;

/// Errors from session CSV files, reports, and the model store.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser rejects a record or a field value.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a rate or page value is NaN or infinite.
    #[error("non-finite value in {path}: row {row_index}, column {column}")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the offending column.
        column: &'static str,
    },

    /// Returned when a 0/1 column holds any other integer.
    #[error("invalid flag in {path}: row {row_index}, column {column} is {value}, expected 0 or 1")]
    InvalidFlag {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the offending column.
        column: &'static str,
        /// The value found.
        value: u8,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV record cannot be serialized or flushed.
    #[error("cannot write CSV file {path}")]
    CsvWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a decoded model fails its structural checks.
    #[error("invalid model in {path}")]
    InvalidModel {
        /// Path to the model file.
        path: PathBuf,
        /// The structural problem found.
        source: shoptree_cart::CartError,
    },

    /// Returned when the envelope's feature header disagrees with the classifier.
    #[error("model in {path} declares {declared} features but its classifier expects {expected}")]
    ModelFeatureMismatch {
        /// Path to the model file.
        path: PathBuf,
        /// Feature count recorded in the envelope.
        declared: usize,
        /// Feature count of the classifier itself.
        expected: usize,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
