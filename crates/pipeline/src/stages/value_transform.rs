//! Elementwise transforms of ICM values.

use super::ensure_known;
use crate::error::Result;
use crate::traits::Preprocess;
use data_loader::DataState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Function applied to every stored value
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Log1p,
    Log,
    Sqrt,
    #[serde(skip)]
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl Transform {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Transform::Custom(Arc::new(f))
    }

    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Transform::Log1p => value.ln_1p(),
            Transform::Log => value.ln(),
            Transform::Sqrt => value.sqrt(),
            Transform::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Log1p => write!(f, "Log1p"),
            Transform::Log => write!(f, "Log"),
            Transform::Sqrt => write!(f, "Sqrt"),
            Transform::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Rewrites the stored values of the listed ICMs; the sparsity pattern is
/// left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueTransform {
    pub transforms: BTreeMap<String, Transform>,
}

impl ValueTransform {
    pub fn new(transforms: BTreeMap<String, Transform>) -> Self {
        Self { transforms }
    }

    pub fn with(mut self, name: impl Into<String>, transform: Transform) -> Self {
        self.transforms.insert(name.into(), transform);
        self
    }
}

impl Preprocess for ValueTransform {
    fn name(&self) -> &'static str {
        "ValueTransform"
    }

    fn transform_features(&self, state: &mut DataState) -> Result<()> {
        ensure_known(self.name(), state, self.transforms.keys())?;

        for (name, transform) in &self.transforms {
            if let Some(feature) = state.icms.get_mut(name) {
                for value in feature.matrix.data_mut() {
                    *value = transform.apply(*value);
                }
                tracing::debug!(
                    "Transformed {} values of {} with {:?}",
                    feature.nnz(),
                    name,
                    transform
                );
            }
        }
        state.icms.rebuild_combined()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessError;
    use crate::stages::testing;
    use crate::Stage;
    use data_loader::ICM_ALL;

    #[test]
    fn test_values_change_pattern_does_not() {
        let before = testing::state();
        let stage = ValueTransform::default().with("price", Transform::custom(|v| v / 10.0));
        let after = Stage::from(stage).apply(before.clone()).unwrap();

        let old = before.icms.get("price").unwrap();
        let new = after.icms.get("price").unwrap();
        assert_eq!(old.matrix.indices(), new.matrix.indices());
        assert_eq!(new.matrix.data(), &[1.0, 2.0, 6.0]);

        // the upstream state is untouched
        assert_eq!(old.matrix.data(), &[10.0, 20.0, 60.0]);

        let all = after.icms.get(ICM_ALL).unwrap();
        let price_col = all.mapper.get("price").unwrap();
        assert_eq!(all.matrix.get(3, price_col), Some(&6.0));
    }

    #[test]
    fn test_log1p() {
        let stage = ValueTransform::default().with("price", Transform::Log1p);
        let state = Stage::from(stage).apply(testing::state()).unwrap();
        let price = state.icms.get("price").unwrap();
        assert!((price.matrix.data()[0] - 11.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_name_fails() {
        let stage = ValueTransform::default().with("ICM_all", Transform::Sqrt);
        let err = Stage::from(stage).apply(testing::state()).unwrap_err();
        assert!(matches!(err, PreprocessError::UnknownFeatureName { .. }));
    }
}
