//! Removal of cold items and users.

use crate::error::Result;
use crate::traits::Preprocess;
use data_loader::sparse;
use data_loader::{reconcile_mapper_with_removed_tokens, DataState, Retained};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Drops items with at most `item_threshold` interactions, then users with at
/// most `user_threshold` interactions among the surviving items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColdRemoval {
    pub item_threshold: usize,
    pub user_threshold: usize,
}

impl ColdRemoval {
    pub fn new(item_threshold: usize, user_threshold: usize) -> Self {
        Self {
            item_threshold,
            user_threshold,
        }
    }
}

impl Preprocess for ColdRemoval {
    fn name(&self) -> &'static str {
        "ColdRemoval"
    }

    fn transform_interactions(&self, state: &mut DataState) -> Result<Retained> {
        let (kept_items, removed_items) = split(
            &sparse::column_counts(&state.urm),
            self.item_threshold,
        );
        let urm = sparse::select(&state.urm, None, Some(&kept_items));

        // Users are counted after the item filter
        let (kept_users, removed_users) = split(&sparse::row_counts(&urm), self.user_threshold);
        let urm = sparse::select(&urm, Some(&kept_users), None);

        tracing::debug!(
            "ColdRemoval dropped {} items and {} users, URM is now {}x{}",
            removed_items.len(),
            removed_users.len(),
            urm.rows(),
            urm.cols()
        );

        state.item_mapper = Arc::new(reconcile_mapper_with_removed_tokens(
            &state.item_mapper,
            &removed_items,
        ));
        state.user_mapper = Arc::new(reconcile_mapper_with_removed_tokens(
            &state.user_mapper,
            &removed_users,
        ));
        state.urm = Arc::new(urm);

        Ok(Retained {
            users: Some(kept_users),
            items: Some(kept_items),
        })
    }
}

/// Indices whose count exceeds `threshold`, and the others
fn split(counts: &[usize], threshold: usize) -> (Vec<usize>, Vec<usize>) {
    (0..counts.len()).partition(|&i| counts[i] > threshold)
}
