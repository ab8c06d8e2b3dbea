//! # Data Loader Crate
//!
//! Loads sparse recommender datasets (interactions plus item and user side
//! information) from delimited files and provides the sparse-matrix building
//! blocks the preprocessing pipeline is made of.
//!
//! ## Main Components
//!
//! - **types**: token mappers and feature matrices
//! - **sparse**: helpers over CSR matrices (counts, slicing, stacking)
//! - **builder**: incremental sparse-matrix builder with token filtering
//! - **parser**: parse `row,col[,data]` files into records
//! - **loaders**: build the URM and one matrix per feature source
//! - **merge**: column-wise union of feature matrices
//! - **collection**: ICM/UCM collections and the loaded dataset state
//! - **reader**: read a dataset directory into a [`DataState`]
//! - **writer**: export matrices back to delimited files
//! - **error**: error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{DataReader, ReaderConfig};
//!
//! let mut reader = DataReader::new("data/recsys2019", ReaderConfig::default());
//! reader.load()?;
//! let state = reader.state().unwrap();
//!
//! println!("{} users x {} items", state.n_users(), state.n_items());
//! let icm_all = state.icms.get("ICM_all");
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod sparse;
pub mod builder;
pub mod parser;
pub mod loaders;
pub mod merge;
pub mod collection;
pub mod reader;
pub mod writer;

// Re-export commonly used types for convenience
pub use builder::{BuiltMatrix, IncrementalSparseMatrix};
pub use collection::{DataState, FeatureCollection, Retained, ICM_ALL, UCM_ALL};
pub use error::{DataLoadError, Result};
pub use loaders::{load_feature, load_interactions, Axis, FeatureSource};
pub use merge::{merge_all, merge_features};
pub use parser::{parse_records, RawRecord};
pub use reader::{DataReader, ReaderConfig};
pub use sparse::SparseMatrix;
pub use types::{reconcile_mapper_with_removed_tokens, FeatureMatrix, NewTokenPolicy, TokenMapper};
pub use writer::{write_matrix, write_state};
