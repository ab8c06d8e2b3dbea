//! Core traits of the preprocessing pipeline.
//!
//! - [`DataSource`]: the surface shared by the raw reader and every
//!   preprocessing stage, so consumers cannot tell them apart
//! - [`Preprocess`]: the two transformation hooks every stage provides

use crate::error::{PreprocessError, Result};
use data_loader::{DataState, FeatureMatrix, Retained, SparseMatrix, TokenMapper};

/// Anything that can be loaded into a [`DataState`].
///
/// `load` is idempotent; the accessors fail with
/// [`PreprocessError::NotLoaded`] until it has succeeded.
pub trait DataSource {
    /// Dataset name, extended by every stage wrapping the source
    fn dataset_name(&self) -> String;

    /// Whether interactions are implicit (all ones)
    fn is_implicit(&self) -> bool;

    /// ICM names the source will expose, known before loading
    fn available_icm_names(&self) -> Vec<String>;

    /// Load the data; later calls are no-ops
    fn load(&mut self) -> Result<()>;

    /// The loaded state
    fn state(&self) -> Result<&DataState>;

    fn is_loaded(&self) -> bool {
        self.state().is_ok()
    }

    fn urm(&self) -> Result<&SparseMatrix> {
        Ok(&*self.state()?.urm)
    }

    fn user_mapper(&self) -> Result<&TokenMapper> {
        Ok(&*self.state()?.user_mapper)
    }

    fn item_mapper(&self) -> Result<&TokenMapper> {
        Ok(&*self.state()?.item_mapper)
    }

    fn icm(&self, name: &str) -> Result<&FeatureMatrix> {
        self.state()?
            .icms
            .get(name)
            .ok_or_else(|| PreprocessError::UnknownFeatureName {
                stage: self.dataset_name(),
                name: name.to_string(),
            })
    }

    /// Column mapper of an ICM
    fn icm_mapper(&self, name: &str) -> Result<&TokenMapper> {
        Ok(&self.icm(name)?.mapper)
    }

    fn ucm(&self, name: &str) -> Result<&FeatureMatrix> {
        self.state()?
            .ucms
            .get(name)
            .ok_or_else(|| PreprocessError::UnknownFeatureName {
                stage: self.dataset_name(),
                name: name.to_string(),
            })
    }

    /// ICM names present after loading, combined entry included
    fn loaded_icm_names(&self) -> Result<Vec<String>> {
        Ok(self.state()?.icms.loaded_names())
    }

    fn loaded_ucm_names(&self) -> Result<Vec<String>> {
        Ok(self.state()?.ucms.loaded_names())
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn dataset_name(&self) -> String {
        (**self).dataset_name()
    }

    fn is_implicit(&self) -> bool {
        (**self).is_implicit()
    }

    fn available_icm_names(&self) -> Vec<String> {
        (**self).available_icm_names()
    }

    fn load(&mut self) -> Result<()> {
        (**self).load()
    }

    fn state(&self) -> Result<&DataState> {
        (**self).state()
    }
}

/// The two hooks of a preprocessing stage.
///
/// The runner calls `transform_interactions`, re-slices every feature matrix
/// to the rows it reports as retained, then calls `transform_features`. A
/// stage overrides only the hook it needs.
pub trait Preprocess {
    /// Returns the name of this stage (for logging and errors)
    fn name(&self) -> &'static str;

    /// Rewrite the interaction matrix and the global mappers
    fn transform_interactions(&self, _state: &mut DataState) -> Result<Retained> {
        Ok(Retained::all())
    }

    /// Rewrite or extend the feature collections
    fn transform_features(&self, _state: &mut DataState) -> Result<()> {
        Ok(())
    }
}
