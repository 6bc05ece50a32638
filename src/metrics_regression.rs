//! Common metrics for rating prediction
//!
//! This module compares a sparse matrix of predictions with a sparse matrix of observations.

use sprs::{CsMat, TriMat};

use crate::error::Result;
use crate::sparse::check_shape;
use crate::Float;

/// Mean squared error between two sparse matrices of the same shape
///
/// Entries stored in only one of the matrices are compared with zero, and the sum of squared
/// differences is divided by the number of cells `n_rows * n_cols`, stored or not.
pub fn mean_sq_error<F: Float>(test: &CsMat<F>, pred: &CsMat<F>) -> Result<F> {
    check_shape(pred, test.shape())?;

    let (m, n) = test.shape();
    if m * n == 0 {
        return Ok(F::zero());
    }

    // duplicated coordinates are summed while compressing, which leaves the difference
    let mut diff = TriMat::with_capacity(test.shape(), test.nnz() + pred.nnz());
    for (val, (i, j)) in test.iter() {
        diff.add_triplet(i, j, *val);
    }
    for (val, (i, j)) in pred.iter() {
        diff.add_triplet(i, j, -*val);
    }
    let diff: CsMat<F> = diff.to_csr();

    let sum_sq = diff.data().iter().map(|&d| d * d).sum::<F>();
    Ok(sum_sq / F::cast(m * n))
}

#[cfg(test)]
mod tests {
    use super::mean_sq_error;
    use crate::error::Error;
    use crate::sparse::{from_triplets, to_dense};
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn random_matrix(shape: (usize, usize), rng: &mut Xoshiro256Plus) -> Array2<f64> {
        Array2::random_using(shape, Uniform::new(0., 1.), rng)
    }

    fn to_sparse(x: &Array2<f64>) -> sprs::CsMat<f64> {
        let triplets = x
            .indexed_iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|((i, j), v)| (i, j, *v))
            .collect::<Vec<_>>();
        from_triplets(x.dim(), &triplets).unwrap()
    }

    #[test]
    fn identical_matrices_have_no_error() {
        let mut rng = Xoshiro256Plus::seed_from_u64(21);
        let mut dense = random_matrix((10, 10), &mut rng);
        dense.mapv_inplace(|v| if v < 0.7 { 0.0 } else { v });
        let test = to_sparse(&dense);
        let pred = test.clone();

        assert_eq!(mean_sq_error(&test, &pred).unwrap(), 0.0);
    }

    #[test]
    fn error_of_offset_matrix() {
        let mut rng = Xoshiro256Plus::seed_from_u64(21);
        let test = random_matrix((10, 10), &mut rng);
        let pred = &test + &(random_matrix((10, 10), &mut rng) * 0.5);

        let expected = (&test - &pred).mapv(|d| d * d).sum() / 100.0;
        let error = mean_sq_error(&to_sparse(&test), &to_sparse(&pred)).unwrap();

        assert_abs_diff_eq!(error, expected, epsilon = 1e-12);
    }

    #[test]
    fn entries_missing_on_one_side_count_against_zero() {
        let test = from_triplets((2, 2), &[(0, 0, 1.0), (1, 1, 2.0)]).unwrap();
        let pred = from_triplets((2, 2), &[(0, 0, 1.0), (0, 1, 1.0)]).unwrap();

        let expected = (to_dense(&test) - to_dense(&pred)).mapv(|d| d * d).sum() / 4.0;
        assert_abs_diff_eq!(mean_sq_error(&test, &pred).unwrap(), expected);
    }

    #[test]
    fn shapes_must_agree() {
        let test = from_triplets::<f64>((2, 2), &[]).unwrap();
        let pred = from_triplets::<f64>((2, 3), &[]).unwrap();
        assert!(matches!(
            mean_sq_error(&test, &pred),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
