//! Data sources: the raw reader and the stage wrapper.
//!
//! A [`PreprocessedSource`] wraps any [`DataSource`] and runs one [`Stage`]
//! on the upstream state when loaded. Wrappers nest, so a chain of stages is
//! itself a `DataSource` and downstream code cannot tell it from a reader.

use crate::error::{PreprocessError, Result};
use crate::stages::Stage;
use crate::traits::DataSource;
use data_loader::{DataReader, DataState};
use serde::{Deserialize, Serialize};

/// How a stage takes the upstream state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Share every structure; the stage copies only what it rewrites
    #[default]
    Share,
    /// Copy every structure up front
    Deep,
}

impl CopyMode {
    pub fn prepare(self, upstream: &DataState) -> DataState {
        match self {
            CopyMode::Share => upstream.clone(),
            CopyMode::Deep => upstream.deep_clone(),
        }
    }
}

/// One stage applied on top of an upstream source.
///
/// ## Usage
/// ```ignore
/// let reader = DataReader::new("data/recsys2019", ReaderConfig::default());
/// let mut source = PreprocessedSource::new(reader, ColdRemoval::new(0, 0).into());
/// source.load()?;
/// let urm = source.urm()?;
/// ```
#[derive(Debug)]
pub struct PreprocessedSource<S> {
    upstream: S,
    stage: Stage,
    copy_mode: CopyMode,
    state: Option<DataState>,
}

impl<S: DataSource> PreprocessedSource<S> {
    pub fn new(upstream: S, stage: Stage) -> Self {
        Self {
            upstream,
            stage,
            copy_mode: CopyMode::default(),
            state: None,
        }
    }

    pub fn with_copy_mode(mut self, copy_mode: CopyMode) -> Self {
        self.copy_mode = copy_mode;
        self
    }

    pub fn upstream(&self) -> &S {
        &self.upstream
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn copy_mode(&self) -> CopyMode {
        self.copy_mode
    }
}

impl<S: DataSource> DataSource for PreprocessedSource<S> {
    fn dataset_name(&self) -> String {
        format!("{}{}", self.upstream.dataset_name(), self.stage.subfolder())
    }

    fn is_implicit(&self) -> bool {
        self.upstream.is_implicit()
    }

    fn available_icm_names(&self) -> Vec<String> {
        self.stage
            .declared_icm_names(self.upstream.available_icm_names())
    }

    fn load(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        self.upstream.load()?;
        let input = self.copy_mode.prepare(self.upstream.state()?);

        tracing::info!(
            "Running {} on {} ({} users x {} items)",
            self.stage.name(),
            self.upstream.dataset_name(),
            input.n_users(),
            input.n_items()
        );
        let output = self.stage.apply(input)?;
        tracing::info!(
            "{} done: {} users x {} items, ICMs {:?}",
            self.stage.name(),
            output.n_users(),
            output.n_items(),
            output.icms.loaded_names()
        );

        self.state = Some(output);
        Ok(())
    }

    fn state(&self) -> Result<&DataState> {
        self.state.as_ref().ok_or_else(|| PreprocessError::NotLoaded {
            dataset: self.dataset_name(),
        })
    }
}

impl DataSource for DataReader {
    fn dataset_name(&self) -> String {
        DataReader::dataset_name(self)
    }

    fn is_implicit(&self) -> bool {
        self.config().is_implicit
    }

    fn available_icm_names(&self) -> Vec<String> {
        DataReader::available_icm_names(self)
    }

    fn load(&mut self) -> Result<()> {
        DataReader::load(self)?;
        Ok(())
    }

    fn state(&self) -> Result<&DataState> {
        DataReader::state(self).ok_or_else(|| PreprocessError::NotLoaded {
            dataset: DataReader::dataset_name(self),
        })
    }
}
