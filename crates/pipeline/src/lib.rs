//! Preprocessing chain for recommender datasets.
//!
//! This crate provides:
//! - DataSource trait, shared by the raw reader and every stage
//! - Preprocess trait and the five stage kinds
//! - PreprocessingPipeline for composing stages
//! - PreprocessedSource, the lazily loaded stage wrapper
//!
//! ## Architecture
//! A stage consumes the upstream [`DataState`](data_loader::DataState) and
//! produces a new one in two steps:
//! 1. Interactions are rewritten (cold users and items dropped) and the
//!    global mappers follow
//! 2. Feature matrices are re-sliced to the surviving rows, then rewritten or
//!    extended, and the combined `ICM_all` is rebuilt
//!
//! ## Example Usage
//! ```ignore
//! use data_loader::{DataReader, ReaderConfig};
//! use pipeline::stages::*;
//! use pipeline::{CopyMode, DataSource, PreprocessingPipeline};
//!
//! let reader = DataReader::new("data/recsys2019", ReaderConfig::default());
//! let pipeline = PreprocessingPipeline::new()
//!     .add_stage(ColdRemoval::new(0, 0))
//!     .add_stage(NumericalImputation::default().with("price", Aggregator::Median))
//!     .add_stage(Digitize::default().with("price", vec![0.1, 0.5, 0.9]));
//!
//! let mut source = pipeline.into_source(reader, CopyMode::Share);
//! source.load()?;
//! let icm_all = source.icm("ICM_all")?;
//! ```

pub mod error;
pub mod traits;
pub mod stages;
pub mod source;
pub mod preprocessing_pipeline;

// Re-export main types
pub use error::{PreprocessError, Result};
pub use preprocessing_pipeline::PreprocessingPipeline;
pub use source::{CopyMode, PreprocessedSource};
pub use stages::{
    Aggregator, ColdRemoval, Digitize, GroupByCounting, NumericalImputation, Stage, Transform,
    ValueTransform,
};
pub use traits::{DataSource, Preprocess};
