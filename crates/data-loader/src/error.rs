//! Error types for the data-loader crate.
//!
//! Every failure that can happen while reading raw files, building sparse
//! matrices or merging feature matrices is one variant of [`DataLoadError`].

use thiserror::Error;

/// Errors that can occur during loading, building and merging of matrices
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A delimited record could not be decoded
    #[error("Parse error in {file}: {source}")]
    ParseError {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A matrix could not be written out
    #[error("Write error in {file}: {source}")]
    WriteError {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A requested feature matrix is not in the collection
    #[error("Unknown feature matrix '{name}'")]
    UnknownFeature { name: String },

    /// Parallel arrays handed to the builder (or matrices handed to a merge)
    /// disagree on their length
    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// Two merged feature matrices both define the same column token
    #[error("Duplicate feature name '{name}' while merging feature matrices")]
    DuplicateFeatureName { name: String },

    /// Invalid configuration value (delimiter, file name, ...)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
