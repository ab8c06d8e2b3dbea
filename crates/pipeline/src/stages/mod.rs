//! Preprocessing stages.
//!
//! Each stage kind lives in its own module and implements [`Preprocess`].
//! [`Stage`] is the closed set of kinds; it is plain data, so a chain can be
//! inspected, compared against expectations in tests, or read from JSON:
//!
//! ```json
//! {"kind": "cold_removal", "item_threshold": 0, "user_threshold": 1}
//! {"kind": "digitize", "bins": {"price": [0.1, 0.5, 0.9]}}
//! ```

pub mod cold_removal;
pub mod digitize;
pub mod group_by_count;
pub mod imputation;
pub mod value_transform;

pub use cold_removal::ColdRemoval;
pub use digitize::Digitize;
pub use group_by_count::GroupByCounting;
pub use imputation::{Aggregator, NumericalImputation};
pub use value_transform::{Transform, ValueTransform};

use crate::error::{PreprocessError, Result};
use crate::traits::Preprocess;
use data_loader::{DataLoadError, DataState, IncrementalSparseMatrix, NewTokenPolicy};
use serde::{Deserialize, Serialize};

/// One preprocessing step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    ColdRemoval(ColdRemoval),
    GroupByCounting(GroupByCounting),
    NumericalImputation(NumericalImputation),
    ValueTransform(ValueTransform),
    Digitize(Digitize),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ColdRemoval(s) => s.name(),
            Stage::GroupByCounting(s) => s.name(),
            Stage::NumericalImputation(s) => s.name(),
            Stage::ValueTransform(s) => s.name(),
            Stage::Digitize(s) => s.name(),
        }
    }

    /// Sub-folder appended to the dataset name of a wrapped source
    pub fn subfolder(&self) -> &'static str {
        match self {
            Stage::ColdRemoval(_) => "removed_cold/",
            Stage::GroupByCounting(_) => "group_count/",
            Stage::NumericalImputation(_) => "imputed/",
            Stage::ValueTransform(_) => "transformed/",
            Stage::Digitize(_) => "digitized/",
        }
    }

    /// ICM names available downstream of this stage
    pub fn declared_icm_names(&self, mut upstream: Vec<String>) -> Vec<String> {
        if let Stage::GroupByCounting(s) = self {
            for name in s.output_names() {
                if !upstream.contains(&name) {
                    upstream.push(name);
                }
            }
        }
        upstream
    }

    /// Run the stage on `state`, producing the next state
    pub fn apply(&self, state: DataState) -> Result<DataState> {
        match self {
            Stage::ColdRemoval(s) => run(s, state),
            Stage::GroupByCounting(s) => run(s, state),
            Stage::NumericalImputation(s) => run(s, state),
            Stage::ValueTransform(s) => run(s, state),
            Stage::Digitize(s) => run(s, state),
        }
    }
}

impl From<ColdRemoval> for Stage {
    fn from(stage: ColdRemoval) -> Self {
        Stage::ColdRemoval(stage)
    }
}

impl From<GroupByCounting> for Stage {
    fn from(stage: GroupByCounting) -> Self {
        Stage::GroupByCounting(stage)
    }
}

impl From<NumericalImputation> for Stage {
    fn from(stage: NumericalImputation) -> Self {
        Stage::NumericalImputation(stage)
    }
}

impl From<ValueTransform> for Stage {
    fn from(stage: ValueTransform) -> Self {
        Stage::ValueTransform(stage)
    }
}

impl From<Digitize> for Stage {
    fn from(stage: Digitize) -> Self {
        Stage::Digitize(stage)
    }
}

fn run<P: Preprocess>(stage: &P, mut state: DataState) -> Result<DataState> {
    let name = stage.name();
    let retained = stage
        .transform_interactions(&mut state)
        .map_err(|e| e.in_stage(name))?;
    state.retain(&retained);
    stage
        .transform_features(&mut state)
        .map_err(|e| e.in_stage(name))?;
    state
        .validate()
        .map_err(|e| PreprocessError::from(e).in_stage(name))?;
    Ok(state)
}

/// Fail unless every name is a named ICM (the combined entry is derived and
/// cannot be targeted).
fn ensure_known<'a, I>(stage: &str, state: &DataState, names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    for name in names {
        if state.icms.get_named(name).is_none() {
            return Err(PreprocessError::UnknownFeatureName {
                stage: stage.to_string(),
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Builder whose rows are the current item space; unknown items are dropped
fn item_feature_builder(state: &DataState) -> IncrementalSparseMatrix {
    IncrementalSparseMatrix::new()
        .with_row_mapper(state.item_mapper.as_ref().clone(), NewTokenPolicy::Ignore)
}

/// Original token of an item index
fn item_token(state: &DataState, row: usize) -> Result<&str> {
    state.item_mapper.token(row).ok_or_else(|| {
        PreprocessError::from(DataLoadError::ShapeMismatch {
            context: "item mapper".to_string(),
            expected: row + 1,
            found: state.n_items(),
        })
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small in-memory dataset shared by the stage tests.

    use data_loader::{
        DataState, FeatureMatrix, IncrementalSparseMatrix, NewTokenPolicy, TokenMapper,
    };

    /// 4 users x 4 items:
    ///
    /// ```text
    ///      i0 i1 i2 i3
    /// u0 [ 1  1  0  0 ]
    /// u1 [ 0  1  0  0 ]
    /// u2 [ 1  1  1  0 ]
    /// u3 [ 0  0  0  0 ]
    /// ```
    pub fn state() -> DataState {
        let users = TokenMapper::from_tokens(["u0", "u1", "u2", "u3"]);
        let items = TokenMapper::from_tokens(["i0", "i1", "i2", "i3"]);
        let mut builder = IncrementalSparseMatrix::new()
            .with_row_mapper(users, NewTokenPolicy::Ignore)
            .with_col_mapper(items, NewTokenPolicy::Ignore);
        builder
            .add_entries(
                &["u0", "u0", "u1", "u2", "u2", "u2"],
                &["i0", "i1", "i1", "i0", "i1", "i2"],
                &[1.0; 6],
            )
            .unwrap();
        let urm = builder.finalize();

        let mut state = DataState::new(urm.matrix, urm.row_mapper, urm.col_mapper, true);
        let price = feature(&["i0", "i1", "i3"], &["price"; 3], &[10.0, 20.0, 60.0]);
        state.icms.insert("price", price);
        let sub_class = feature(
            &["i0", "i1", "i2", "i3"],
            &["sub_class-1", "sub_class-1", "sub_class-2", "sub_class-1"],
            &[1.0; 4],
        );
        state.icms.insert("sub_class", sub_class);
        state.icms.rebuild_combined().unwrap();

        let mut ucm = IncrementalSparseMatrix::new()
            .with_row_mapper(state.user_mapper.as_ref().clone(), NewTokenPolicy::Ignore);
        ucm.add_entries(&["u0", "u3"], &["age-1", "age-2"], &[1.0, 1.0]).unwrap();
        state.ucms.insert("age", ucm.finalize().into_feature());
        state.ucms.rebuild_combined().unwrap();
        state
    }

    pub fn feature(rows: &[&str], cols: &[&str], values: &[f64]) -> FeatureMatrix {
        let items = TokenMapper::from_tokens(["i0", "i1", "i2", "i3"]);
        let mut builder =
            IncrementalSparseMatrix::new().with_row_mapper(items, NewTokenPolicy::Ignore);
        builder.add_entries(rows, cols, values).unwrap();
        builder.finalize().into_feature()
    }
}
