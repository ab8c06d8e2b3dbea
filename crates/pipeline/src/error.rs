//! Error types for the preprocessing pipeline.

use data_loader::DataLoadError;
use thiserror::Error;

/// Errors raised while loading a source or running a stage
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// Failure of the raw reader (missing file, bad record, ...)
    #[error(transparent)]
    Data(#[from] DataLoadError),

    /// A data-loader failure (shape mismatch, duplicate column) inside a stage
    #[error("{stage}: {source}")]
    Stage {
        stage: String,
        #[source]
        source: DataLoadError,
    },

    /// A stage references a feature matrix absent from the collection
    #[error("{stage}: unknown feature matrix '{name}'")]
    UnknownFeatureName { stage: String, name: String },

    /// Digitization requested on a matrix with more than one column
    #[error("{stage}: feature matrix '{name}' has {columns} columns, expected exactly one")]
    NotSingleColumn {
        stage: String,
        name: String,
        columns: usize,
    },

    /// Imputation requested on a matrix without any value to aggregate
    #[error("{stage}: feature matrix '{name}' has no values to aggregate")]
    EmptyFeature { stage: String, name: String },

    /// Bin edges must be finite and non-decreasing
    #[error("{stage}: bin edges for '{name}' must be finite and non-decreasing")]
    InvalidBinEdges { stage: String, name: String },

    /// An accessor was called before `load()` completed
    #[error("{dataset} is not loaded, call load() first")]
    NotLoaded { dataset: String },
}

impl PreprocessError {
    /// Attach the name of the failing stage to data-loader errors
    pub(crate) fn in_stage(self, stage: &str) -> Self {
        match self {
            PreprocessError::Data(source) => PreprocessError::Stage {
                stage: stage.to_string(),
                source,
            },
            other => other,
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PreprocessError>;
