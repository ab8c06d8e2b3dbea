//! Horizontal merge of feature matrices sharing one row space.

use crate::error::{DataLoadError, Result};
use crate::sparse;
use crate::types::FeatureMatrix;

/// Concatenate the columns of `left` and `right`.
///
/// The merged mapper keeps `left`'s indices and shifts `right`'s by the width
/// of `left`. Column tokens must be disjoint.
pub fn merge_features(left: &FeatureMatrix, right: &FeatureMatrix) -> Result<FeatureMatrix> {
    if left.rows() != right.rows() {
        return Err(DataLoadError::ShapeMismatch {
            context: "feature matrix rows".to_string(),
            expected: left.rows(),
            found: right.rows(),
        });
    }

    let mut mapper = left.mapper.clone();
    for token in right.mapper.tokens() {
        if mapper.contains(token) {
            return Err(DataLoadError::DuplicateFeatureName {
                name: token.clone(),
            });
        }
        mapper.insert(token.as_str());
    }

    Ok(FeatureMatrix::new(
        sparse::hstack(&left.matrix, &right.matrix),
        mapper,
    ))
}

/// Fold [`merge_features`] over `features`; `None` when there is nothing to
/// merge.
pub fn merge_all<'a, I>(features: I) -> Result<Option<FeatureMatrix>>
where
    I: IntoIterator<Item = &'a FeatureMatrix>,
{
    let mut merged: Option<FeatureMatrix> = None;
    for feature in features {
        merged = Some(match merged {
            None => feature.clone(),
            Some(acc) => merge_features(&acc, feature)?,
        });
    }
    Ok(merged)
}
