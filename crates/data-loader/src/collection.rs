//! Loaded dataset state: interaction matrix, global mappers and the ICM/UCM
//! collections.
//!
//! Every structure sits behind an `Arc`. Cloning a [`DataState`] therefore
//! shares all matrices, and a mutation goes through `Arc::make_mut`, which
//! copies the one structure being changed if anybody else still holds it.
//! Two states can never observe each other's writes.

use crate::error::{DataLoadError, Result};
use crate::merge::{merge_all, merge_features};
use crate::sparse::{self, SparseMatrix};
use crate::types::{FeatureMatrix, TokenMapper};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the combined item-content matrix
pub const ICM_ALL: &str = "ICM_all";
/// Name of the combined user-content matrix
pub const UCM_ALL: &str = "UCM_all";

/// Named feature matrices sharing one row space, plus an optional combined
/// entry holding the column-wise union of all of them.
#[derive(Debug, Clone)]
pub struct FeatureCollection {
    combined_name: String,
    keep_combined: bool,
    features: BTreeMap<String, Arc<FeatureMatrix>>,
    combined: Option<Arc<FeatureMatrix>>,
}

impl FeatureCollection {
    /// `keep_combined` decides whether [`Self::rebuild_combined`] maintains
    /// the combined entry.
    pub fn new(combined_name: impl Into<String>, keep_combined: bool) -> Self {
        Self {
            combined_name: combined_name.into(),
            keep_combined,
            features: BTreeMap::new(),
            combined: None,
        }
    }

    pub fn combined_name(&self) -> &str {
        &self.combined_name
    }

    pub fn keeps_combined(&self) -> bool {
        self.keep_combined
    }

    /// Insert or replace a named matrix. The combined entry is left as is.
    pub fn insert(&mut self, name: impl Into<String>, feature: FeatureMatrix) {
        self.features.insert(name.into(), Arc::new(feature));
    }

    /// Look up a named matrix or the combined entry
    pub fn get(&self, name: &str) -> Option<&FeatureMatrix> {
        if name == self.combined_name {
            return self.combined();
        }
        self.features.get(name).map(Arc::as_ref)
    }

    /// Look up a named matrix only, never the combined entry
    pub fn get_named(&self, name: &str) -> Option<&FeatureMatrix> {
        self.features.get(name).map(Arc::as_ref)
    }

    /// Mutable access to a named matrix, copying it first if it is shared
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FeatureMatrix> {
        self.features.get_mut(name).map(Arc::make_mut)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn combined(&self) -> Option<&FeatureMatrix> {
        self.combined.as_deref()
    }

    /// Named matrices, without the combined entry
    pub fn feature_names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    /// Every name [`Self::get`] answers for
    pub fn loaded_names(&self) -> Vec<String> {
        let mut names = self.feature_names();
        if self.combined.is_some() {
            names.push(self.combined_name.clone());
        }
        names
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureMatrix)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Recompute the combined entry from the named matrices
    pub fn rebuild_combined(&mut self) -> Result<()> {
        if !self.keep_combined {
            return Ok(());
        }
        self.combined = merge_all(self.features.values().map(Arc::as_ref))?.map(Arc::new);
        Ok(())
    }

    /// Merge a subset of the named matrices, in the given order. Every name
    /// must be present; `None` only when `names` is empty.
    pub fn merge_named(&self, names: &[&str]) -> Result<Option<FeatureMatrix>> {
        let mut merged: Option<FeatureMatrix> = None;
        for name in names {
            let feature = self
                .features
                .get(*name)
                .ok_or_else(|| DataLoadError::UnknownFeature {
                    name: name.to_string(),
                })?;
            merged = Some(match merged {
                None => feature.as_ref().clone(),
                Some(acc) => merge_features(&acc, feature)?,
            });
        }
        Ok(merged)
    }

    /// Keep only `rows` (indices into the current row space) in every matrix,
    /// the combined one included.
    pub fn retain_rows(&mut self, rows: &[usize]) {
        for feature in self.features.values_mut() {
            *feature = Arc::new(feature.select_rows(rows));
        }
        if let Some(combined) = self.combined.as_mut() {
            *combined = Arc::new(combined.select_rows(rows));
        }
    }

    /// Grow (or shrink) every matrix to `rows` rows
    pub fn resize_rows(&mut self, rows: usize) {
        let resize = |feature: &Arc<FeatureMatrix>| {
            Arc::new(FeatureMatrix::new(
                sparse::resize(&feature.matrix, rows, feature.cols()),
                feature.mapper.clone(),
            ))
        };
        for feature in self.features.values_mut() {
            if feature.rows() != rows {
                *feature = resize(feature);
            }
        }
        if let Some(combined) = self.combined.as_mut() {
            if combined.rows() != rows {
                *combined = resize(combined);
            }
        }
    }

    /// A copy sharing no structure with `self`
    pub fn deep_clone(&self) -> Self {
        Self {
            combined_name: self.combined_name.clone(),
            keep_combined: self.keep_combined,
            features: self
                .features
                .iter()
                .map(|(k, v)| (k.clone(), Arc::new(v.as_ref().clone())))
                .collect(),
            combined: self.combined.as_ref().map(|c| Arc::new(c.as_ref().clone())),
        }
    }
}

/// Row indices that survived a stage, per global index space. `None` means
/// the whole space survived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retained {
    pub users: Option<Vec<usize>>,
    pub items: Option<Vec<usize>>,
}

impl Retained {
    /// Nothing removed
    pub fn all() -> Self {
        Self::default()
    }
}

/// Everything a data source exposes once loaded
#[derive(Debug, Clone)]
pub struct DataState {
    pub urm: Arc<SparseMatrix>,
    pub user_mapper: Arc<TokenMapper>,
    pub item_mapper: Arc<TokenMapper>,
    pub icms: FeatureCollection,
    pub ucms: FeatureCollection,
    pub is_implicit: bool,
}

impl DataState {
    /// A state with the given interactions and empty feature collections
    pub fn new(
        urm: SparseMatrix,
        user_mapper: TokenMapper,
        item_mapper: TokenMapper,
        is_implicit: bool,
    ) -> Self {
        Self {
            urm: Arc::new(urm),
            user_mapper: Arc::new(user_mapper),
            item_mapper: Arc::new(item_mapper),
            icms: FeatureCollection::new(ICM_ALL, true),
            ucms: FeatureCollection::new(UCM_ALL, true),
            is_implicit,
        }
    }

    pub fn n_users(&self) -> usize {
        self.user_mapper.len()
    }

    pub fn n_items(&self) -> usize {
        self.item_mapper.len()
    }

    /// Re-slice the feature collections to the surviving users and items
    pub fn retain(&mut self, retained: &Retained) {
        if let Some(items) = &retained.items {
            self.icms.retain_rows(items);
        }
        if let Some(users) = &retained.users {
            self.ucms.retain_rows(users);
        }
    }

    /// Check that every matrix agrees with the global user and item spaces
    pub fn validate(&self) -> Result<()> {
        if self.urm.rows() != self.n_users() {
            return Err(DataLoadError::ShapeMismatch {
                context: "URM rows".to_string(),
                expected: self.n_users(),
                found: self.urm.rows(),
            });
        }
        if self.urm.cols() != self.n_items() {
            return Err(DataLoadError::ShapeMismatch {
                context: "URM columns".to_string(),
                expected: self.n_items(),
                found: self.urm.cols(),
            });
        }
        let collections = [(&self.icms, self.n_items()), (&self.ucms, self.n_users())];
        for (collection, rows) in collections {
            let combined = collection
                .combined()
                .map(|c| (collection.combined_name(), c));
            for (name, feature) in collection.iter().chain(combined) {
                if feature.rows() != rows {
                    return Err(DataLoadError::ShapeMismatch {
                        context: format!("rows of {}", name),
                        expected: rows,
                        found: feature.rows(),
                    });
                }
            }
        }
        Ok(())
    }

    /// A copy sharing no structure with `self`
    pub fn deep_clone(&self) -> Self {
        Self {
            urm: Arc::new(self.urm.as_ref().clone()),
            user_mapper: Arc::new(self.user_mapper.as_ref().clone()),
            item_mapper: Arc::new(self.item_mapper.as_ref().clone()),
            icms: self.icms.deep_clone(),
            ucms: self.ucms.deep_clone(),
            is_implicit: self.is_implicit,
        }
    }

    /// Merge of asset, price and optionally item popularity. Fails with
    /// [`DataLoadError::UnknownFeature`] if any of them was not loaded.
    pub fn numerical_icm(&self, with_popularity: bool) -> Result<FeatureMatrix> {
        let mut names = vec!["asset", "price"];
        if with_popularity {
            names.push("item_pop");
        }
        let merged = self.icms.merge_named(&names)?;
        Ok(merged.unwrap_or_else(|| FeatureMatrix::empty(self.n_items())))
    }
}
