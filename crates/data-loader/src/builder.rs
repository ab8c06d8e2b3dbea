//! Incremental construction of sparse matrices from token triples.
//!
//! [`IncrementalSparseMatrix`] accepts `(row token, column token, value)`
//! triples, resolves tokens to indices through its row/column mappers and
//! produces a CSR matrix on [`IncrementalSparseMatrix::finalize`]. Mappers can
//! be pre-initialised so that several builders share one index space.

use crate::error::{DataLoadError, Result};
use crate::sparse::SparseMatrix;
use crate::types::{FeatureMatrix, NewTokenPolicy, TokenMapper};
use sprs::TriMat;

/// Result of [`IncrementalSparseMatrix::finalize`]
#[derive(Debug, Clone)]
pub struct BuiltMatrix {
    pub matrix: SparseMatrix,
    pub row_mapper: TokenMapper,
    pub col_mapper: TokenMapper,
}

impl BuiltMatrix {
    /// Keep the matrix and its column mapper, dropping the row mapper
    pub fn into_feature(self) -> FeatureMatrix {
        FeatureMatrix::new(self.matrix, self.col_mapper)
    }
}

/// Accumulates coordinate entries, assigning or filtering indices on the fly.
///
/// ## Usage
/// ```ignore
/// let mut builder = IncrementalSparseMatrix::new()
///     .with_row_mapper(item_mapper, NewTokenPolicy::Ignore);
/// builder.add_entries(&rows, &cols, &values)?;
/// let built = builder.finalize();
/// ```
#[derive(Debug, Default)]
pub struct IncrementalSparseMatrix {
    row_mapper: TokenMapper,
    col_mapper: TokenMapper,
    on_new_row: NewTokenPolicy,
    on_new_col: NewTokenPolicy,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
    skipped: usize,
}

impl IncrementalSparseMatrix {
    /// Empty mappers on both axes, new tokens are added
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing row mapper (builder pattern)
    pub fn with_row_mapper(mut self, mapper: TokenMapper, on_new_row: NewTokenPolicy) -> Self {
        self.row_mapper = mapper;
        self.on_new_row = on_new_row;
        self
    }

    /// Start from an existing column mapper (builder pattern)
    pub fn with_col_mapper(mut self, mapper: TokenMapper, on_new_col: NewTokenPolicy) -> Self {
        self.col_mapper = mapper;
        self.on_new_col = on_new_col;
        self
    }

    /// Add a single triple. Returns `false` when the record was dropped
    /// because one of its tokens is unknown under the `Ignore` policy.
    pub fn add_entry(&mut self, row: &str, col: &str, value: f64) -> bool {
        let row_idx = self.row_mapper.get(row);
        let col_idx = self.col_mapper.get(col);

        // Decide before inserting anything, so a dropped record never grows
        // the other axis.
        if (row_idx.is_none() && self.on_new_row == NewTokenPolicy::Ignore)
            || (col_idx.is_none() && self.on_new_col == NewTokenPolicy::Ignore)
        {
            self.skipped += 1;
            return false;
        }

        let row_idx = row_idx.unwrap_or_else(|| self.row_mapper.insert(row));
        let col_idx = col_idx.unwrap_or_else(|| self.col_mapper.insert(col));

        self.rows.push(row_idx);
        self.cols.push(col_idx);
        self.values.push(value);
        true
    }

    /// Add parallel arrays of row tokens, column tokens and values
    pub fn add_entries<R, C>(&mut self, rows: &[R], cols: &[C], values: &[f64]) -> Result<()>
    where
        R: AsRef<str>,
        C: AsRef<str>,
    {
        if cols.len() != rows.len() {
            return Err(DataLoadError::ShapeMismatch {
                context: "column tokens".to_string(),
                expected: rows.len(),
                found: cols.len(),
            });
        }
        if values.len() != rows.len() {
            return Err(DataLoadError::ShapeMismatch {
                context: "values".to_string(),
                expected: rows.len(),
                found: values.len(),
            });
        }

        self.rows.reserve(rows.len());
        self.cols.reserve(rows.len());
        self.values.reserve(rows.len());

        for ((row, col), &value) in rows.iter().zip(cols).zip(values) {
            self.add_entry(row.as_ref(), col.as_ref(), value);
        }
        Ok(())
    }

    /// Number of stored (not yet summed) entries
    pub fn n_entries(&self) -> usize {
        self.values.len()
    }

    /// Number of records dropped by the `Ignore` policy
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn row_mapper(&self) -> &TokenMapper {
        &self.row_mapper
    }

    pub fn col_mapper(&self) -> &TokenMapper {
        &self.col_mapper
    }

    /// Build the CSR matrix. Its shape is `(|row mapper|, |col mapper|)`;
    /// duplicate coordinates are summed.
    pub fn finalize(self) -> BuiltMatrix {
        let shape = (self.row_mapper.len(), self.col_mapper.len());
        let mut tri = TriMat::with_capacity(shape, self.values.len());
        for ((&row, &col), &value) in self.rows.iter().zip(&self.cols).zip(&self.values) {
            tri.add_triplet(row, col, value);
        }
        if self.skipped > 0 {
            tracing::debug!(
                "Incremental builder dropped {} records with unknown tokens",
                self.skipped
            );
        }

        BuiltMatrix {
            matrix: tri.to_csr(),
            row_mapper: self.row_mapper,
            col_mapper: self.col_mapper,
        }
    }
}
