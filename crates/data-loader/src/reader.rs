//! The raw dataset reader: reads every configured source file from a
//! directory and builds the initial [`DataState`].
//!
//! Steps performed by [`DataReader::load`]:
//! 1. Parse all source files in parallel (rayon)
//! 2. Build the interaction matrix, which defines the user and item spaces
//! 3. Build each feature matrix against the current item or user mapper
//! 4. Pad earlier matrices if a feature loader extended a mapper
//! 5. Rebuild the combined `ICM_all` / `UCM_all` entries

use crate::collection::{DataState, FeatureCollection, ICM_ALL, UCM_ALL};
use crate::error::Result;
use crate::loaders::{self, Axis, FeatureSource};
use crate::parser::{self, RawRecord};
use crate::sparse;
use crate::types::{NewTokenPolicy, TokenMapper};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reader settings. Every field has a default, so `{}` is a valid
/// configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Interaction file, relative to the data directory
    pub interactions_file: String,
    /// Feature sources to load, in load order
    pub features: Vec<FeatureSource>,
    /// Per-source file overrides
    pub feature_files: BTreeMap<FeatureSource, String>,
    pub delimiter: char,
    /// Store 1.0 for every interaction instead of the `data` field
    pub is_implicit: bool,
    /// Policy of feature loaders for items absent from the interactions
    pub on_new_item: NewTokenPolicy,
    /// Policy of feature loaders for users absent from the interactions
    pub on_new_user: NewTokenPolicy,
    pub build_icm_all: bool,
    pub build_ucm_all: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            interactions_file: "data_train.csv".to_string(),
            features: FeatureSource::ALL.to_vec(),
            feature_files: BTreeMap::new(),
            delimiter: ',',
            is_implicit: true,
            on_new_item: NewTokenPolicy::Ignore,
            on_new_user: NewTokenPolicy::Ignore,
            build_icm_all: true,
            build_ucm_all: true,
        }
    }
}

impl ReaderConfig {
    /// File a feature source is read from
    pub fn feature_file(&self, source: FeatureSource) -> &str {
        match self.feature_files.get(&source) {
            Some(file) => file.as_str(),
            None if source == FeatureSource::ItemPopularity => self.interactions_file.as_str(),
            None => source.default_file(),
        }
    }
}

/// Reads a dataset directory into a [`DataState`], once.
#[derive(Debug)]
pub struct DataReader {
    data_dir: PathBuf,
    config: ReaderConfig,
    state: Option<DataState>,
}

impl DataReader {
    pub fn new(data_dir: impl Into<PathBuf>, config: ReaderConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
            state: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Name of the dataset, the data directory's name followed by a slash
    pub fn dataset_name(&self) -> String {
        let name = self
            .data_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        format!("{}/", name)
    }

    /// ICM names this reader will produce, known before loading
    pub fn available_icm_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .config
            .features
            .iter()
            .filter(|s| s.axis() == Axis::Item)
            .map(|s| s.name().to_string())
            .collect();
        if self.config.build_icm_all {
            names.push(ICM_ALL.to_string());
        }
        names
    }

    /// Read every file; later calls are no-ops
    pub fn load(&mut self) -> Result<()> {
        if self.state.is_none() {
            self.state = Some(self.read()?);
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// The loaded state, `None` before [`Self::load`]
    pub fn state(&self) -> Option<&DataState> {
        self.state.as_ref()
    }

    fn read(&self) -> Result<DataState> {
        let delimiter = parser::delimiter_byte(self.config.delimiter)?;
        tracing::info!("Loading dataset from {}", self.data_dir.display());

        // Parsing is independent per file; building is not, since every
        // feature loader extends the mappers of the previous ones.
        let urm_path = self.data_dir.join(&self.config.interactions_file);
        let (interactions, features) = rayon::join(
            || parser::parse_records(&urm_path, delimiter),
            || {
                self.config
                    .features
                    .par_iter()
                    .map(|&source| {
                        let path = self.data_dir.join(self.config.feature_file(source));
                        parser::parse_records(&path, delimiter).map(|records| (source, records))
                    })
                    .collect::<Result<Vec<(FeatureSource, Vec<RawRecord>)>>>()
            },
        );
        let interactions = interactions?;
        let features = features?;

        let urm = loaders::load_interactions(
            &interactions,
            TokenMapper::new(),
            NewTokenPolicy::Add,
            TokenMapper::new(),
            NewTokenPolicy::Add,
            self.config.is_implicit,
        )?;
        tracing::info!(
            "Loaded URM: {} users x {} items, {} interactions",
            urm.matrix.rows(),
            urm.matrix.cols(),
            urm.matrix.nnz()
        );

        let mut user_mapper = urm.row_mapper;
        let mut item_mapper = urm.col_mapper;
        let mut icms = FeatureCollection::new(ICM_ALL, self.config.build_icm_all);
        let mut ucms = FeatureCollection::new(UCM_ALL, self.config.build_ucm_all);

        for (source, records) in &features {
            let built = match source.axis() {
                Axis::Item => {
                    let policy = self.config.on_new_item;
                    let mut built = loaders::load_feature(*source, records, item_mapper, policy)?;
                    item_mapper = std::mem::take(&mut built.row_mapper);
                    built
                }
                Axis::User => {
                    let policy = self.config.on_new_user;
                    let mut built = loaders::load_feature(*source, records, user_mapper, policy)?;
                    user_mapper = std::mem::take(&mut built.row_mapper);
                    built
                }
            };
            tracing::info!(
                "Loaded {}: {} rows x {} columns, {} entries",
                source.name(),
                built.matrix.rows(),
                built.matrix.cols(),
                built.matrix.nnz()
            );
            let target = match source.axis() {
                Axis::Item => &mut icms,
                Axis::User => &mut ucms,
            };
            target.insert(source.name(), built.into_feature());
        }

        // Feature loaders running with the Add policy may have grown a space
        let (n_users, n_items) = (user_mapper.len(), item_mapper.len());
        let mut urm_matrix = urm.matrix;
        if urm_matrix.shape() != (n_users, n_items) {
            tracing::warn!(
                "Feature sources introduced new tokens, padding URM to {} x {}",
                n_users,
                n_items
            );
            urm_matrix = sparse::resize(&urm_matrix, n_users, n_items);
        }
        icms.resize_rows(n_items);
        ucms.resize_rows(n_users);

        icms.rebuild_combined()?;
        ucms.rebuild_combined()?;

        let state = DataState {
            urm: Arc::new(urm_matrix),
            user_mapper: Arc::new(user_mapper),
            item_mapper: Arc::new(item_mapper),
            icms,
            ucms,
            is_implicit: self.config.is_implicit,
        };
        state.validate()?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_dataset(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("data_train.csv"),
            "row,col,data\n0,10,1.0\n0,11,1.0\n1,11,1.0\n2,12,1.0\n",
        )
        .unwrap();
        fs::write(dir.join("data_ICM_asset.csv"), "row,col,data\n10,0,0.5\n12,0,0.25\n").unwrap();
        fs::write(dir.join("data_ICM_price.csv"), "row,col,data\n11,0,9.0\n99,0,1.0\n").unwrap();
        fs::write(
            dir.join("data_ICM_sub_class.csv"),
            "row,col,data\n10,3,1\n11,3,1\n12,4,1\n",
        )
        .unwrap();
        fs::write(dir.join("data_UCM_age.csv"), "row,col,data\n0,2,1\n1,5,1\n").unwrap();
        fs::write(dir.join("data_UCM_region.csv"), "row,col,data\n2,7,1\n").unwrap();
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("data-loader-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_load_dataset_directory() {
        let dir = temp_dir("reader");
        write_dataset(&dir);

        let mut reader = DataReader::new(&dir, ReaderConfig::default());
        assert!(reader.state().is_none());
        reader.load().unwrap();
        let state = reader.state().unwrap();

        assert_eq!(state.urm.shape(), (3, 3));
        assert_eq!(state.item_mapper.tokens(), &["10", "11", "12"]);
        // item 99 is unknown and ignored
        assert_eq!(state.icms.get("price").unwrap().nnz(), 1);
        assert_eq!(state.icms.get("sub_class").unwrap().cols(), 2);
        assert_eq!(state.icms.get("item_pop").unwrap().nnz(), 3);
        // asset + price + sub_class(2) + item_pop
        assert_eq!(state.icms.get(ICM_ALL).unwrap().cols(), 5);
        assert_eq!(state.ucms.get(UCM_ALL).unwrap().matrix.shape(), (3, 3));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_add_policy_pads_interactions() {
        let dir = temp_dir("pad");
        write_dataset(&dir);

        let config = ReaderConfig {
            on_new_item: NewTokenPolicy::Add,
            ..ReaderConfig::default()
        };
        let mut reader = DataReader::new(&dir, config);
        reader.load().unwrap();
        let state = reader.state().unwrap();

        assert_eq!(state.n_items(), 4);
        assert_eq!(state.urm.shape(), (3, 4));
        for (_, feature) in state.icms.iter() {
            assert_eq!(feature.rows(), 4);
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = temp_dir("missing");
        fs::create_dir_all(&dir).unwrap();
        let mut reader = DataReader::new(&dir, ReaderConfig::default());
        assert!(reader.load().is_err());
        assert!(!reader.is_loaded());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: ReaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.feature_file(FeatureSource::ItemPopularity), "data_train.csv");

        let config: ReaderConfig =
            serde_json::from_str(r#"{"features": ["asset"], "feature_files": {"asset": "a.csv"}}"#)
                .unwrap();
        assert_eq!(config.feature_file(FeatureSource::Asset), "a.csv");
        assert_eq!(config.features, vec![FeatureSource::Asset]);
    }
}
