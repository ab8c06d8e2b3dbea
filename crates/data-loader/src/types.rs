//! Core domain types shared by the loaders, the merge helpers and the
//! preprocessing pipeline.
//!
//! - [`TokenMapper`]: bijection between original identifiers and dense indices
//! - [`NewTokenPolicy`]: what to do with identifiers a mapper has never seen
//! - [`FeatureMatrix`]: a sparse matrix together with its column mapper

use crate::sparse::{self, SparseMatrix};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Token mapping
// =============================================================================

/// Maps original identifiers ("tokens") to contiguous zero-based indices.
///
/// Indices are handed out in insertion order, so `tokens()[i]` is always the
/// token with index `i`. The only way to shrink a mapper is
/// [`reconcile_mapper_with_removed_tokens`], which rebuilds it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMapper {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl TokenMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapper from tokens in index order. Repeated tokens keep the
    /// index of their first occurrence.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mapper = Self::new();
        for token in tokens {
            mapper.insert(token);
        }
        mapper
    }

    /// Index of `token`, assigning the next free index if it is new.
    pub fn insert(&mut self, token: impl Into<String>) -> usize {
        let token = token.into();
        if let Some(&idx) = self.index.get(&token) {
            return idx;
        }
        let idx = self.tokens.len();
        self.index.insert(token.clone(), idx);
        self.tokens.push(token);
        idx
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn token(&self, idx: usize) -> Option<&str> {
        self.tokens.get(idx).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in index order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// `(token, index)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tokens.iter().enumerate().map(|(i, t)| (t.as_str(), i))
    }
}

/// Drop the tokens sitting at `removed` (original indices) and re-index the
/// survivors contiguously, preserving their relative order.
///
/// Out-of-range indices in `removed` are ignored.
pub fn reconcile_mapper_with_removed_tokens(
    mapper: &TokenMapper,
    removed: &[usize],
) -> TokenMapper {
    if removed.is_empty() {
        return mapper.clone();
    }
    let removed: HashSet<usize> = removed.iter().copied().collect();
    TokenMapper::from_tokens(
        mapper
            .iter()
            .filter(|(_, idx)| !removed.contains(idx))
            .map(|(token, _)| token.to_string()),
    )
}

/// Behaviour of a builder when it meets a token its mapper does not know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewTokenPolicy {
    /// Assign the next free index
    #[default]
    Add,
    /// Silently drop the whole record
    Ignore,
}

// =============================================================================
// Feature matrices
// =============================================================================

/// A content matrix (ICM or UCM): rows follow the global item or user index
/// space, columns are described by `mapper`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub matrix: SparseMatrix,
    pub mapper: TokenMapper,
}

impl FeatureMatrix {
    pub fn new(matrix: SparseMatrix, mapper: TokenMapper) -> Self {
        debug_assert_eq!(matrix.cols(), mapper.len());
        Self { matrix, mapper }
    }

    /// A matrix with `rows` rows and no columns
    pub fn empty(rows: usize) -> Self {
        Self {
            matrix: sparse::empty(rows, 0),
            mapper: TokenMapper::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    pub fn cols(&self) -> usize {
        self.matrix.cols()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Keep only the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            matrix: sparse::select(&self.matrix, Some(rows), None),
            mapper: self.mapper.clone(),
        }
    }

    /// `(row, column token, value)` for every stored entry
    pub fn entries(&self) -> Vec<(usize, String, f64)> {
        self.matrix
            .iter()
            .map(|(&v, (r, c))| {
                let token = self.mapper.token(c).unwrap_or_default().to_string();
                (r, token, v)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_contiguous_indices() {
        let mut mapper = TokenMapper::new();
        assert_eq!(mapper.insert("a"), 0);
        assert_eq!(mapper.insert("b"), 1);
        assert_eq!(mapper.insert("a"), 0);
        assert_eq!(mapper.len(), 2);
        assert_eq!(mapper.token(1), Some("b"));
        assert_eq!(mapper.get("c"), None);
    }

    #[test]
    fn test_reconcile_empty_removal_is_noop() {
        let mapper = TokenMapper::from_tokens(["10", "20", "30"]);
        let reconciled = reconcile_mapper_with_removed_tokens(&mapper, &[]);
        assert_eq!(reconciled, mapper);
    }

    #[test]
    fn test_reconcile_preserves_survivor_order() {
        let mapper = TokenMapper::from_tokens(["u0", "u1", "u2", "u3", "u4"]);
        let reconciled = reconcile_mapper_with_removed_tokens(&mapper, &[1, 3]);

        assert_eq!(reconciled.len(), mapper.len() - 2);
        assert_eq!(reconciled.tokens(), &["u0", "u2", "u4"]);
        assert_eq!(reconciled.get("u2"), Some(1));
        assert_eq!(reconciled.get("u4"), Some(2));
        assert!(!reconciled.contains("u1"));
    }

    #[test]
    fn test_reconcile_rank_among_survivors() {
        let tokens: Vec<String> = (0..20).map(|i| format!("t{}", i)).collect();
        let mapper = TokenMapper::from_tokens(tokens.clone());
        let removed: Vec<usize> = (0..20).filter(|i| i % 3 == 0).collect();

        let reconciled = reconcile_mapper_with_removed_tokens(&mapper, &removed);
        assert_eq!(reconciled.len(), 20 - removed.len());

        let survivors: Vec<&String> = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(i))
            .map(|(_, t)| t)
            .collect();
        for (rank, token) in survivors.iter().enumerate() {
            assert_eq!(reconciled.get(token), Some(rank));
        }
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: NewTokenPolicy = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(policy, NewTokenPolicy::Ignore);
    }
}
