//! Raw loaders: turn parsed records into one named matrix each.
//!
//! The interaction loader defines the user and item index spaces. Feature
//! loaders receive the current item (or user) mapper and hand back the
//! possibly extended one, so every matrix stays aligned with the others.

use crate::builder::{BuiltMatrix, IncrementalSparseMatrix};
use crate::error::Result;
use crate::parser::RawRecord;
use crate::types::{NewTokenPolicy, TokenMapper};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which global index space the rows of a feature matrix belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Item,
    User,
}

/// The named side-information sources of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Asset,
    Price,
    SubClass,
    ItemPopularity,
    Age,
    Region,
}

impl FeatureSource {
    pub const ALL: [FeatureSource; 6] = [
        FeatureSource::Asset,
        FeatureSource::Price,
        FeatureSource::SubClass,
        FeatureSource::ItemPopularity,
        FeatureSource::Age,
        FeatureSource::Region,
    ];

    /// Name of the feature matrix in its collection
    pub fn name(&self) -> &'static str {
        match self {
            FeatureSource::Asset => "asset",
            FeatureSource::Price => "price",
            FeatureSource::SubClass => "sub_class",
            FeatureSource::ItemPopularity => "item_pop",
            FeatureSource::Age => "age",
            FeatureSource::Region => "region",
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            FeatureSource::Age | FeatureSource::Region => Axis::User,
            _ => Axis::Item,
        }
    }

    /// File read when the configuration does not override it. Popularity is
    /// derived from the interaction file.
    pub fn default_file(&self) -> &'static str {
        match self {
            FeatureSource::Asset => "data_ICM_asset.csv",
            FeatureSource::Price => "data_ICM_price.csv",
            FeatureSource::SubClass => "data_ICM_sub_class.csv",
            FeatureSource::ItemPopularity => "data_train.csv",
            FeatureSource::Age => "data_UCM_age.csv",
            FeatureSource::Region => "data_UCM_region.csv",
        }
    }

    /// Column token for a raw `col` value. Single-valued numeric sources have
    /// one column named after the source, categorical ones get one column
    /// per category.
    fn column_label(&self, raw_col: &str) -> String {
        match self {
            FeatureSource::Asset | FeatureSource::Price | FeatureSource::ItemPopularity => {
                self.name().to_string()
            }
            _ => format!("{}-{}", self.name(), raw_col),
        }
    }

    fn uses_values(&self) -> bool {
        matches!(self, FeatureSource::Asset | FeatureSource::Price)
    }
}

/// Build the user x item interaction matrix.
///
/// Implicit datasets store 1.0 for every interaction regardless of `data`.
pub fn load_interactions(
    records: &[RawRecord],
    user_mapper: TokenMapper,
    on_new_user: NewTokenPolicy,
    item_mapper: TokenMapper,
    on_new_item: NewTokenPolicy,
    implicit: bool,
) -> Result<BuiltMatrix> {
    let users: Vec<&str> = records.iter().map(|r| r.row.as_str()).collect();
    let items: Vec<&str> = records.iter().map(|r| r.col.as_str()).collect();
    let values: Vec<f64> = records
        .iter()
        .map(|r| if implicit { 1.0 } else { r.value() })
        .collect();

    let mut builder = IncrementalSparseMatrix::new()
        .with_row_mapper(user_mapper, on_new_user)
        .with_col_mapper(item_mapper, on_new_item);
    builder.add_entries(&users, &items, &values)?;
    Ok(builder.finalize())
}

/// Build one feature matrix whose rows follow `row_mapper`
pub fn load_feature(
    source: FeatureSource,
    records: &[RawRecord],
    row_mapper: TokenMapper,
    on_new_row: NewTokenPolicy,
) -> Result<BuiltMatrix> {
    let (rows, cols, values) = match source {
        FeatureSource::ItemPopularity => popularity_triples(records),
        _ => {
            let rows = records.iter().map(|r| r.row.clone()).collect();
            let cols = records.iter().map(|r| source.column_label(&r.col)).collect();
            let values = records
                .iter()
                .map(|r| if source.uses_values() { r.value() } else { 1.0 })
                .collect();
            (rows, cols, values)
        }
    };

    let mut builder = IncrementalSparseMatrix::new().with_row_mapper(row_mapper, on_new_row);
    builder.add_entries(&rows, &cols, &values)?;
    Ok(builder.finalize())
}

/// Sum `data` per item (the `col` field of the interaction file) and scale by
/// the maximum so every popularity lies in [0, 1].
fn popularity_triples(records: &[RawRecord]) -> (Vec<String>, Vec<String>, Vec<f64>) {
    let mut popularity: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        *popularity.entry(record.col.as_str()).or_insert(0.0) += record.value();
    }

    let max = popularity.values().copied().fold(0.0_f64, f64::max);
    let label = FeatureSource::ItemPopularity.column_label("");

    let mut rows = Vec::with_capacity(popularity.len());
    let mut values = Vec::with_capacity(popularity.len());
    for (item, count) in popularity {
        rows.push(item.to_string());
        values.push(if max > 0.0 { count / max } else { 0.0 });
    }
    let cols = vec![label; rows.len()];
    (rows, cols, values)
}
