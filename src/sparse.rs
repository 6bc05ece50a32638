//! Helpers to build and slice sparse interaction matrices
//!
//! Interaction matrices are plain `sprs` matrices in compressed row storage. The helpers here
//! cover what the learners and the model selection need: construction from coordinates,
//! extraction of a subset of the stored entries and densification.

use ndarray::Array2;
use sprs::{CsMat, TriMat};

use crate::error::{Error, Result};
use crate::Float;

/// Builds a CSR matrix of the given shape from `(row, col, value)` triplets
///
/// Duplicated coordinates are summed. Fails if a coordinate lies outside the shape.
pub fn from_triplets<F: Float>(
    shape: (usize, usize),
    triplets: &[(usize, usize, F)],
) -> Result<CsMat<F>> {
    let mut tri = TriMat::with_capacity(shape, triplets.len());
    for &(i, j, val) in triplets {
        if i >= shape.0 || j >= shape.1 {
            return Err(Error::Parameters(format!(
                "entry ({}, {}) outside of a {}x{} matrix",
                i, j, shape.0, shape.1
            )));
        }
        tri.add_triplet(i, j, val);
    }

    Ok(tri.to_csr())
}

/// Stored entries of `x` as `(row, col, value)` triplets, in storage order
pub fn triplets<F: Float>(x: &CsMat<F>) -> Vec<(usize, usize, F)> {
    x.iter().map(|(val, (i, j))| (i, j, *val)).collect()
}

/// Matrix with the same shape as `x` that keeps only the stored entries whose position in
/// storage order is listed in `inds`
///
/// This is how cross-validation folds over the nonzero entries are materialised.
pub fn submatrix<F: Float>(x: &CsMat<F>, inds: &[usize]) -> Result<CsMat<F>> {
    let entries = triplets(x);
    let mut selected = Vec::with_capacity(inds.len());
    for &ind in inds {
        let entry = entries.get(ind).copied().ok_or_else(|| {
            Error::Parameters(format!(
                "entry index {} out of bounds for {} stored entries",
                ind,
                entries.len()
            ))
        })?;
        selected.push(entry);
    }

    from_triplets(x.shape(), &selected)
}

/// Dense copy of `x`
pub fn to_dense<F: Float>(x: &CsMat<F>) -> Array2<F> {
    let mut dense = Array2::zeros(x.shape());
    for (val, (i, j)) in x.iter() {
        dense[(i, j)] += *val;
    }
    dense
}

/// Checks that `x` has the expected shape
pub fn check_shape<F: Float>(x: &CsMat<F>, expected: (usize, usize)) -> Result<()> {
    if x.shape() == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected,
            found: x.shape(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn triplets_roundtrip_through_dense() {
        let x = from_triplets((2, 3), &[(0, 2, 1.0), (1, 0, 3.0), (0, 2, 0.5)]).unwrap();

        assert_abs_diff_eq!(to_dense(&x), array![[0., 0., 1.5], [3., 0., 0.]]);
        assert_eq!(x.nnz(), 2);
    }

    #[test]
    fn out_of_bounds_entry_fails() {
        assert!(matches!(
            from_triplets((2, 2), &[(2, 0, 1.0)]),
            Err(Error::Parameters(_))
        ));
    }

    #[test]
    fn submatrices_partition_entries() {
        let x = from_triplets(
            (3, 3),
            &[(0, 0, 1.0), (0, 2, 2.0), (1, 1, 3.0), (2, 0, 4.0)],
        )
        .unwrap();

        let a = submatrix(&x, &[0, 3]).unwrap();
        let b = submatrix(&x, &[1, 2]).unwrap();

        assert_eq!(a.shape(), (3, 3));
        assert_eq!(a.nnz() + b.nnz(), x.nnz());
        assert_abs_diff_eq!(to_dense(&a) + to_dense(&b), to_dense(&x));
        assert!(submatrix(&x, &[4]).is_err());
    }

    #[test]
    fn shape_is_checked() {
        let x = from_triplets::<f32>((2, 3), &[]).unwrap();
        assert!(check_shape(&x, (2, 3)).is_ok());
        assert!(matches!(
            check_shape(&x, (3, 2)),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
