//! Bucketing of single-column numerical ICMs into one-hot categories.

use super::{ensure_known, item_feature_builder, item_token};
use crate::error::{PreprocessError, Result};
use crate::traits::Preprocess;
use data_loader::{DataState, FeatureMatrix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replaces each listed single-column ICM with one-hot columns
/// `{name}-{bin}`, where `bin` is the number of edges less than or equal to
/// the value (so `edges.len() + 1` bins in total).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Digitize {
    pub bins: BTreeMap<String, Vec<f64>>,
}

impl Digitize {
    pub fn new(bins: BTreeMap<String, Vec<f64>>) -> Self {
        Self { bins }
    }

    pub fn with(mut self, name: impl Into<String>, edges: Vec<f64>) -> Self {
        self.bins.insert(name.into(), edges);
        self
    }

    fn digitize(
        &self,
        state: &DataState,
        name: &str,
        source: &FeatureMatrix,
        edges: &[f64],
    ) -> Result<FeatureMatrix> {
        if source.cols() != 1 {
            return Err(PreprocessError::NotSingleColumn {
                stage: self.name().to_string(),
                name: name.to_string(),
                columns: source.cols(),
            });
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] > w[1]) {
            return Err(PreprocessError::InvalidBinEdges {
                stage: self.name().to_string(),
                name: name.to_string(),
            });
        }

        let mut builder = item_feature_builder(state);
        for (&value, (row, _)) in source.matrix.iter() {
            let label = format!("{}-{}", name, bin_index(edges, value));
            builder.add_entry(item_token(state, row)?, &label, 1.0);
        }
        Ok(builder.finalize().into_feature())
    }
}

/// Index of the bin holding `value`: `edges[i - 1] <= value < edges[i]`
pub fn bin_index(edges: &[f64], value: f64) -> usize {
    edges.partition_point(|&edge| edge <= value)
}

impl Preprocess for Digitize {
    fn name(&self) -> &'static str {
        "Digitize"
    }

    fn transform_features(&self, state: &mut DataState) -> Result<()> {
        ensure_known(self.name(), state, self.bins.keys())?;

        let mut digitized = Vec::with_capacity(self.bins.len());
        for (name, edges) in &self.bins {
            if let Some(source) = state.icms.get_named(name) {
                let feature = self.digitize(state, name, source, edges)?;
                tracing::debug!("Digitized {} into {} bins", name, feature.cols());
                digitized.push((name.clone(), feature));
            }
        }

        for (name, feature) in digitized {
            state.icms.insert(name, feature);
        }
        state.icms.rebuild_combined()?;
        Ok(())
    }
}
