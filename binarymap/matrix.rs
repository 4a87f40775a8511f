use crate::types::ValidationError;
use faer::sparse::{SparseRowMat, Triplet};
use ndarray::{Array1, Array2};
use std::fmt;

/// A read-only sparse 0/1 matrix in compressed-row form.
///
/// Row `i` holds the ascending column indices whose value is 1; every other entry
/// is 0. Built once from coordinate lists and never mutated.
#[derive(Clone)]
pub struct BinaryMatrix {
    inner: SparseRowMat<usize, f64>,
}

impl BinaryMatrix {
    /// Converts `(rows[k], cols[k])` coordinate pairs of ones into compressed rows
    /// in one bulk conversion. Pairs may come in any order but must be distinct and
    /// in bounds.
    pub fn from_coordinates(
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
    ) -> Result<Self, ValidationError> {
        if rows.len() != cols.len() {
            return Err(ValidationError::CoordinateLength {
                rows: rows.len(),
                cols: cols.len(),
            });
        }

        let mut triplets = Vec::with_capacity(rows.len());
        for (&row, &col) in rows.iter().zip(cols) {
            if row >= nrows || col >= ncols {
                return Err(ValidationError::CoordinateOutOfBounds {
                    row,
                    col,
                    shape: (nrows, ncols),
                });
            }
            triplets.push(Triplet::new(row, col, 1.0));
        }

        let inner = SparseRowMat::<usize, f64>::try_new_from_triplets(nrows, ncols, &triplets)
            .map_err(|err| ValidationError::SparseConstruction(format!("{err:?}")))?;
        let matrix = Self { inner };
        // Summed duplicates would show up as entries other than 1.
        if matrix.inner.parts().1.iter().any(|&v| v != 1.0) {
            return Err(ValidationError::DuplicateCoordinate);
        }
        Ok(matrix)
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Number of stored ones.
    pub fn nnz(&self) -> usize {
        self.inner.parts().1.len()
    }

    fn row_ptr(&self) -> &[usize] {
        let (symbolic, _) = self.inner.parts();
        symbolic.row_ptr()
    }

    /// Ascending column indices set in `row`.
    pub fn row(&self, row: usize) -> &[usize] {
        let (symbolic, _) = self.inner.parts();
        let row_ptr = symbolic.row_ptr();
        &symbolic.col_idx()[row_ptr[row]..row_ptr[row + 1]]
    }

    pub fn get(&self, row: usize, col: usize) -> i8 {
        i8::from(self.row(row).binary_search(&col).is_ok())
    }

    pub fn row_dense(&self, row: usize) -> Array1<i8> {
        let mut dense = Array1::zeros(self.ncols());
        for &col in self.row(row) {
            dense[col] = 1;
        }
        dense
    }

    pub fn to_dense(&self) -> Array2<i8> {
        let mut dense = Array2::zeros(self.shape());
        for row in 0..self.nrows() {
            for &col in self.row(row) {
                dense[[row, col]] = 1;
            }
        }
        dense
    }

    /// Number of ones in each row.
    pub fn row_sums(&self) -> Array1<usize> {
        self.row_ptr().windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// The underlying `faer` matrix, with every stored value equal to 1.
    pub fn as_faer(&self) -> &SparseRowMat<usize, f64> {
        &self.inner
    }
}

impl PartialEq for BinaryMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.row_ptr() == other.row_ptr()
            && self.inner.parts().0.col_idx() == other.inner.parts().0.col_idx()
    }
}

impl Eq for BinaryMatrix {}

impl fmt::Debug for BinaryMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryMatrix")
            .field("nrows", &self.nrows())
            .field("ncols", &self.ncols())
            .field("row_ptr", &self.row_ptr())
            .field("col_idx", &self.inner.parts().0.col_idx())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn builds_rows_from_unordered_coordinates() {
        let matrix = BinaryMatrix::from_coordinates(3, 4, &[2, 0, 2, 0], &[3, 1, 0, 2]).unwrap();
        assert_eq!(matrix.shape(), (3, 4));
        assert_eq!(matrix.nnz(), 4);
        assert_eq!(matrix.row(0), &[1usize, 2]);
        assert!(matrix.row(1).is_empty());
        assert_eq!(matrix.row(2), &[0usize, 3]);
        assert_eq!(
            matrix.to_dense(),
            array![[0i8, 1, 1, 0], [0, 0, 0, 0], [1, 0, 0, 1]]
        );
        assert_eq!(matrix.row_sums(), array![2usize, 0, 2]);
    }

    #[test]
    fn single_entry_access_matches_dense_rows() {
        let matrix = BinaryMatrix::from_coordinates(2, 3, &[1, 0], &[2, 0]).unwrap();
        assert_eq!(matrix.get(0, 0), 1);
        assert_eq!(matrix.get(0, 2), 0);
        assert_eq!(matrix.get(1, 2), 1);
        assert_eq!(matrix.row_dense(1), array![0i8, 0, 1]);
        assert_eq!(matrix.as_faer().nrows(), 2);
    }

    #[test]
    fn empty_matrix_has_no_entries() {
        let matrix = BinaryMatrix::from_coordinates(0, 5, &[], &[]).unwrap();
        assert_eq!(matrix.shape(), (0, 5));
        assert_eq!(matrix.nnz(), 0);
        assert_eq!(matrix.to_dense().shape(), &[0, 5]);
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert!(matches!(
            BinaryMatrix::from_coordinates(2, 2, &[0, 1], &[0]),
            Err(ValidationError::CoordinateLength { rows: 2, cols: 1 })
        ));
        assert!(matches!(
            BinaryMatrix::from_coordinates(2, 2, &[0, 2], &[0, 1]),
            Err(ValidationError::CoordinateOutOfBounds { row: 2, col: 1, .. })
        ));
        assert!(matches!(
            BinaryMatrix::from_coordinates(2, 2, &[1, 1], &[0, 0]),
            Err(ValidationError::DuplicateCoordinate)
        ));
    }

    #[test]
    fn equality_compares_the_pattern() {
        let a = BinaryMatrix::from_coordinates(2, 2, &[0, 1], &[1, 0]).unwrap();
        let b = BinaryMatrix::from_coordinates(2, 2, &[1, 0], &[0, 1]).unwrap();
        let c = BinaryMatrix::from_coordinates(2, 2, &[0], &[1]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
