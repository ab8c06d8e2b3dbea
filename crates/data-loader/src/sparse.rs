//! Helpers over compressed sparse matrices.
//!
//! Every matrix in the workspace is a CSR `sprs::CsMat<f64>`. Structural
//! rewrites (slicing, padding, stacking) go through a `TriMat` and back, which
//! keeps indices sorted and sums duplicates.

use sprs::{CsMat, TriMat};

/// Sparse matrix type used across the workspace
pub type SparseMatrix = CsMat<f64>;

/// An all-zero matrix of the given shape
pub fn empty(rows: usize, cols: usize) -> SparseMatrix {
    let tri: TriMat<f64> = TriMat::new((rows, cols));
    tri.to_csr()
}

/// Number of stored entries in each column
pub fn column_counts(matrix: &SparseMatrix) -> Vec<usize> {
    let mut counts = vec![0; matrix.cols()];
    for (_, (_, col)) in matrix.iter() {
        counts[col] += 1;
    }
    counts
}

/// Number of stored entries in each row
pub fn row_counts(matrix: &SparseMatrix) -> Vec<usize> {
    let mut counts = vec![0; matrix.rows()];
    for (_, (row, _)) in matrix.iter() {
        counts[row] += 1;
    }
    counts
}

/// Sum of all stored values
pub fn total(matrix: &SparseMatrix) -> f64 {
    matrix.data().iter().sum()
}

/// Keep the listed rows and columns, in the listed order. `None` keeps the
/// whole axis.
pub fn select(
    matrix: &SparseMatrix,
    rows: Option<&[usize]>,
    cols: Option<&[usize]>,
) -> SparseMatrix {
    let row_map = position_map(matrix.rows(), rows);
    let col_map = position_map(matrix.cols(), cols);
    let n_rows = rows.map_or(matrix.rows(), <[usize]>::len);
    let n_cols = cols.map_or(matrix.cols(), <[usize]>::len);

    let mut tri = TriMat::new((n_rows, n_cols));
    for (&value, (row, col)) in matrix.iter() {
        if let (Some(r), Some(c)) = (row_map[row], col_map[col]) {
            tri.add_triplet(r, c, value);
        }
    }
    tri.to_csr()
}

/// Change the shape of `matrix`, keeping every entry that still fits
pub fn resize(matrix: &SparseMatrix, rows: usize, cols: usize) -> SparseMatrix {
    if matrix.shape() == (rows, cols) {
        return matrix.clone();
    }
    let mut tri = TriMat::new((rows, cols));
    for (&value, (row, col)) in matrix.iter() {
        if row < rows && col < cols {
            tri.add_triplet(row, col, value);
        }
    }
    tri.to_csr()
}

/// Place `right` to the right of `left`. Both must have the same number of
/// rows.
pub fn hstack(left: &SparseMatrix, right: &SparseMatrix) -> SparseMatrix {
    debug_assert_eq!(left.rows(), right.rows());
    let offset = left.cols();
    let mut tri = TriMat::new((left.rows(), offset + right.cols()));
    for (&value, (row, col)) in left.iter() {
        tri.add_triplet(row, col, value);
    }
    for (&value, (row, col)) in right.iter() {
        tri.add_triplet(row, offset + col, value);
    }
    tri.to_csr()
}

fn position_map(len: usize, keep: Option<&[usize]>) -> Vec<Option<usize>> {
    match keep {
        None => (0..len).map(Some).collect(),
        Some(keep) => {
            let mut map = vec![None; len];
            for (new, &old) in keep.iter().enumerate() {
                if old < len {
                    map[old] = Some(new);
                }
            }
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix {
        // 3x3
        // [1 0 2]
        // [0 0 3]
        // [4 0 0]
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(0, 2, 2.0);
        tri.add_triplet(1, 2, 3.0);
        tri.add_triplet(2, 0, 4.0);
        tri.to_csr()
    }

    #[test]
    fn test_counts() {
        let m = sample();
        assert_eq!(column_counts(&m), vec![2, 0, 2]);
        assert_eq!(row_counts(&m), vec![2, 1, 1]);
        assert_eq!(total(&m), 10.0);
    }

    #[test]
    fn test_select_rows_and_columns() {
        let m = sample();
        let s = select(&m, Some(&[0, 2]), Some(&[0, 2]));
        assert_eq!(s.shape(), (2, 2));
        assert_eq!(s.get(0, 0), Some(&1.0));
        assert_eq!(s.get(0, 1), Some(&2.0));
        assert_eq!(s.get(1, 0), Some(&4.0));
        assert_eq!(s.nnz(), 3);
    }

    #[test]
    fn test_resize_pads_with_zeros() {
        let m = sample();
        let r = resize(&m, 5, 4);
        assert_eq!(r.shape(), (5, 4));
        assert_eq!(r.nnz(), m.nnz());
    }

    #[test]
    fn test_hstack_offsets_right_columns() {
        let m = sample();
        let stacked = hstack(&m, &m);
        assert_eq!(stacked.shape(), (3, 6));
        assert_eq!(stacked.get(1, 5), Some(&3.0));
        assert_eq!(total(&stacked), 20.0);
    }

    #[test]
    fn test_empty_matrix() {
        let e = empty(4, 0);
        assert_eq!(e.shape(), (4, 0));
        assert_eq!(e.nnz(), 0);
        assert!(column_counts(&e).is_empty());
        assert_eq!(row_counts(&e), vec![0; 4]);
    }
}
