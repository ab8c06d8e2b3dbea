//! The PreprocessingPipeline orchestrates multiple stages.
//!
//! A pipeline is an ordered list of [`Stage`] values. It can be applied
//! directly to a [`DataState`], or turned into a nested chain of
//! [`PreprocessedSource`] wrappers around a reader.

use crate::error::Result;
use crate::source::{CopyMode, PreprocessedSource};
use crate::stages::Stage;
use crate::traits::DataSource;
use data_loader::DataState;
use serde::{Deserialize, Serialize};

/// Chains multiple stages together.
///
/// ## Usage
/// ```ignore
/// let pipeline = PreprocessingPipeline::new()
///     .add_stage(ColdRemoval::new(0, 0))
///     .add_stage(GroupByCounting::new(["sub_class"]))
///     .add_stage(Digitize::default().with("price", vec![0.1, 0.5, 0.9]));
///
/// let state = pipeline.apply(reader.state().unwrap().clone())?;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingPipeline {
    stages: Vec<Stage>,
}

impl PreprocessingPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage to the end of the pipeline (builder pattern)
    pub fn add_stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply all stages in sequence. The first failing stage aborts the run.
    pub fn apply(&self, state: DataState) -> Result<DataState> {
        let mut current = state;
        for stage in &self.stages {
            tracing::debug!(
                "Applying stage: {} (input: {} users x {} items, {} ICMs)",
                stage.name(),
                current.n_users(),
                current.n_items(),
                current.icms.len()
            );
            current = stage.apply(current)?;
            tracing::debug!(
                "Stage applied: {} (output: {} users x {} items, {} ICMs)",
                stage.name(),
                current.n_users(),
                current.n_items(),
                current.icms.len()
            );
        }
        Ok(current)
    }

    /// ICM names available after the whole pipeline
    pub fn declared_icm_names(&self, upstream: Vec<String>) -> Vec<String> {
        self.stages
            .iter()
            .fold(upstream, |names, stage| stage.declared_icm_names(names))
    }

    /// Wrap `upstream` in one [`PreprocessedSource`] per stage, first stage
    /// innermost.
    pub fn into_source<S>(self, upstream: S, copy_mode: CopyMode) -> Box<dyn DataSource>
    where
        S: DataSource + 'static,
    {
        self.stages
            .into_iter()
            .fold(Box::new(upstream) as Box<dyn DataSource>, |source, stage| {
                Box::new(PreprocessedSource::new(source, stage).with_copy_mode(copy_mode))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessError;
    use crate::stages::{testing, ColdRemoval, Digitize, GroupByCounting};

    #[test]
    fn test_empty_pipeline() {
        let state = testing::state();
        let out = PreprocessingPipeline::new().apply(state.clone()).unwrap();
        assert_eq!(out.urm.shape(), state.urm.shape());
        assert_eq!(out.icms.loaded_names(), state.icms.loaded_names());
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = PreprocessingPipeline::new()
            .add_stage(ColdRemoval::default())
            .add_stage(GroupByCounting::new(["sub_class"]));
        assert_eq!(pipeline.len(), 2);

        let state = pipeline.apply(testing::state()).unwrap();
        // counts are taken over the three surviving items
        let counts = state.icms.get("sub_class_count").unwrap();
        assert_eq!(counts.rows(), 3);
        assert_eq!(counts.matrix.get(0, 0), Some(&2.0));
        assert_eq!(counts.matrix.get(2, 0), Some(&1.0));
    }

    #[test]
    fn test_failing_stage_aborts() {
        let pipeline = PreprocessingPipeline::new()
            .add_stage(ColdRemoval::default())
            .add_stage(Digitize::default().with("sub_class", vec![1.0]));
        assert!(matches!(
            pipeline.apply(testing::state()),
            Err(PreprocessError::NotSingleColumn { .. })
        ));
    }

    #[test]
    fn test_pipeline_from_json() {
        let pipeline: PreprocessingPipeline = serde_json::from_str(
            r#"{"stages": [
                {"kind": "cold_removal", "user_threshold": 1},
                {"kind": "group_by_counting", "feature_names": ["sub_class"]},
                {"kind": "value_transform", "transforms": {"price": "log1p"}}
            ]}"#,
        )
        .unwrap();
        let names: Vec<&str> = pipeline.stages().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["ColdRemoval", "GroupByCounting", "ValueTransform"]);
        assert_eq!(
            pipeline.declared_icm_names(vec!["sub_class".to_string()]),
            vec!["sub_class", "sub_class_count"]
        );
    }
}
