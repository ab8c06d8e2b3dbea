//! Frequency features derived from categorical ICMs.

use super::{ensure_known, item_feature_builder, item_token};
use crate::error::Result;
use crate::traits::Preprocess;
use data_loader::sparse;
use data_loader::{DataState, FeatureMatrix};
use serde::{Deserialize, Serialize};

/// For every listed ICM, adds `{name}_count`: a single column holding, at each
/// item, how many items share that item's feature value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByCounting {
    pub feature_names: Vec<String>,
}

impl GroupByCounting {
    pub fn new<I, S>(feature_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feature_names: feature_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of the ICMs this stage adds
    pub fn output_names(&self) -> Vec<String> {
        self.feature_names.iter().map(|n| count_name(n)).collect()
    }
}

fn count_name(name: &str) -> String {
    format!("{}_count", name)
}

impl Preprocess for GroupByCounting {
    fn name(&self) -> &'static str {
        "GroupByCounting"
    }

    fn transform_features(&self, state: &mut DataState) -> Result<()> {
        ensure_known(self.name(), state, &self.feature_names)?;

        let mut added: Vec<(String, FeatureMatrix)> = Vec::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            let Some(source) = state.icms.get_named(name) else {
                continue;
            };
            let counts = sparse::column_counts(&source.matrix);
            let label = count_name(name);

            let mut builder = item_feature_builder(state);
            for (_, (row, col)) in source.matrix.iter() {
                builder.add_entry(item_token(state, row)?, &label, counts[col] as f64);
            }
            let feature = builder.finalize().into_feature();
            tracing::debug!("Built {} with {} entries", label, feature.nnz());
            added.push((label, feature));
        }

        for (name, feature) in added {
            state.icms.insert(name, feature);
        }
        state.icms.rebuild_combined()?;
        Ok(())
    }
}
