//! Imputation of missing numerical features.

use super::{ensure_known, item_feature_builder, item_token};
use crate::error::{PreprocessError, Result};
use crate::traits::Preprocess;
use data_loader::sparse;
use data_loader::{DataState, FeatureMatrix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Reduction of the stored values of a feature matrix to one value
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    Mean,
    Median,
    Min,
    Max,
    /// Caller-supplied reduction, only available from code
    #[serde(skip)]
    Custom(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>),
}

impl Aggregator {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Aggregator::Custom(Arc::new(f))
    }

    /// Reduce `values`, which must not be empty
    pub fn aggregate(&self, values: &[f64]) -> f64 {
        match self {
            Aggregator::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregator::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregator::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregator::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregator::Custom(f) => f(values),
        }
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregator::Mean => write!(f, "Mean"),
            Aggregator::Median => write!(f, "Median"),
            Aggregator::Min => write!(f, "Min"),
            Aggregator::Max => write!(f, "Max"),
            Aggregator::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Fills every item without an entry in a listed ICM with the aggregate of
/// that ICM's stored values.
///
/// The filled value goes into the column of the first stored entry. Columns
/// are relabelled `{name}-{column index}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalImputation {
    pub aggregators: BTreeMap<String, Aggregator>,
}

impl NumericalImputation {
    pub fn new(aggregators: BTreeMap<String, Aggregator>) -> Self {
        Self { aggregators }
    }

    /// Add one ICM to impute (builder pattern)
    pub fn with(mut self, name: impl Into<String>, aggregator: Aggregator) -> Self {
        self.aggregators.insert(name.into(), aggregator);
        self
    }

    fn impute(
        &self,
        state: &DataState,
        name: &str,
        source: &FeatureMatrix,
        aggregator: &Aggregator,
    ) -> Result<FeatureMatrix> {
        if source.nnz() == 0 {
            return Err(PreprocessError::EmptyFeature {
                stage: self.name().to_string(),
                name: name.to_string(),
            });
        }
        let value = aggregator.aggregate(source.matrix.data());
        let fill_col = source.matrix.indices()[0];

        let mut builder = item_feature_builder(state);
        for (&v, (row, col)) in source.matrix.iter() {
            builder.add_entry(item_token(state, row)?, &format!("{}-{}", name, col), v);
        }
        let fill_label = format!("{}-{}", name, fill_col);
        let mut filled = 0;
        for (row, count) in sparse::row_counts(&source.matrix).into_iter().enumerate() {
            if count == 0 {
                builder.add_entry(item_token(state, row)?, &fill_label, value);
                filled += 1;
            }
        }
        tracing::debug!("Imputed {} items of {} with {}", filled, name, value);

        Ok(builder.finalize().into_feature())
    }
}

impl Preprocess for NumericalImputation {
    fn name(&self) -> &'static str {
        "NumericalImputation"
    }

    fn transform_features(&self, state: &mut DataState) -> Result<()> {
        ensure_known(self.name(), state, self.aggregators.keys())?;

        let mut imputed = Vec::with_capacity(self.aggregators.len());
        for (name, aggregator) in &self.aggregators {
            if let Some(source) = state.icms.get_named(name) {
                imputed.push((name.clone(), self.impute(state, name, source, aggregator)?));
            }
        }

        for (name, feature) in imputed {
            state.icms.insert(name, feature);
        }
        state.icms.rebuild_combined()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing;
    use crate::Stage;
    use data_loader::ICM_ALL;

    #[test]
    fn test_aggregators() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(Aggregator::Mean.aggregate(&values), 2.5);
        assert_eq!(Aggregator::Median.aggregate(&values), 2.5);
        assert_eq!(Aggregator::Median.aggregate(&values[..3]), 3.0);
        assert_eq!(Aggregator::Min.aggregate(&values), 1.0);
        assert_eq!(Aggregator::Max.aggregate(&values), 4.0);
        assert_eq!(Aggregator::custom(|v| v.len() as f64).aggregate(&values), 4.0);
    }

    #[test]
    fn test_missing_item_gets_aggregate() {
        let stage = NumericalImputation::default().with("price", Aggregator::Mean);
        let state = Stage::from(stage).apply(testing::state()).unwrap();

        let price = state.icms.get("price").unwrap();
        assert_eq!(price.mapper.tokens(), &["price-0"]);
        assert_eq!(price.nnz(), 4);
        // i2 had no price; mean of 10, 20 and 60
        assert_eq!(price.matrix.get(2, 0), Some(&30.0));
        assert_eq!(price.matrix.get(3, 0), Some(&60.0));

        let all = state.icms.get(ICM_ALL).unwrap();
        assert!(all.mapper.contains("price-0"));
        assert!(!all.mapper.contains("price"));
    }

    #[test]
    fn test_fully_covered_feature_is_only_relabelled() {
        let stage = NumericalImputation::default().with("sub_class", Aggregator::Median);
        let state = Stage::from(stage).apply(testing::state()).unwrap();

        let sub_class = state.icms.get("sub_class").unwrap();
        assert_eq!(sub_class.nnz(), 4);
        assert_eq!(sub_class.mapper.tokens(), &["sub_class-0", "sub_class-1"]);
    }

    #[test]
    fn test_empty_feature_fails() {
        let mut state = testing::state();
        state.icms.insert("empty", FeatureMatrix::empty(4));

        let stage = NumericalImputation::default().with("empty", Aggregator::Mean);
        let err = Stage::from(stage).apply(state).unwrap_err();
        assert!(matches!(err, PreprocessError::EmptyFeature { ref name, .. } if name == "empty"));
    }

    #[test]
    fn test_aggregator_from_json() {
        let stage: NumericalImputation =
            serde_json::from_str(r#"{"aggregators": {"price": "median"}}"#).unwrap();
        assert!(matches!(stage.aggregators.get("price"), Some(Aggregator::Median)));
    }
}
