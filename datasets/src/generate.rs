//! Utility functions for randomly generating interaction matrices

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::{
    rand::{seq::index, Rng},
    rand_distr::{StandardNormal, Uniform},
    RandomExt,
};
use sprs::{CsMat, TriMat};

/// Samples `num_inds` distinct entries of a random rank-`k` matrix `U diag(s) V^T`
///
/// `U` (`m x k`) and `V` (`n x k`) have standard normal entries scaled by `1/sqrt(m)` and
/// `1/sqrt(n)`, and the singular values `s` decay as `1, 1/2, .., 1/k`. Returns `(X, U, s, V)`
/// where `X` holds the sampled entries. `num_inds` is capped at `m * n`.
pub fn sparse_low_rank(
    shape: (usize, usize),
    k: usize,
    num_inds: usize,
    rng: &mut impl Rng,
) -> (CsMat<f64>, Array2<f64>, Array1<f64>, Array2<f64>) {
    let (m, n) = shape;
    let u = Array2::random_using((m, k), StandardNormal, rng) / (m.max(1) as f64).sqrt();
    let v = Array2::random_using((n, k), StandardNormal, rng) / (n.max(1) as f64).sqrt();
    let s = Array1::from_shape_fn(k, |j| 1.0 / (j + 1) as f64);

    let us = &u * &s.view().insert_axis(Axis(0));
    let mut tri = TriMat::with_capacity(shape, num_inds);
    for flat in index::sample(rng, m * n, num_inds.min(m * n)) {
        let (i, j) = (flat / n, flat % n);
        tri.add_triplet(i, j, us.row(i).dot(&v.row(j)));
    }

    (tri.to_csr(), u, s, v)
}

/// Binary matrix of the items every user scores above the `w`-quantile of their row
///
/// Scores are `U V^T` with `U` (`m x k`) and `V` (`n x k`) uniform in `[0, 1)`. Row `i` of `X` is
/// one exactly where the score exceeds the `w`-quantile of row `i`, so roughly a fraction
/// `1 - w` of every row is observed. Returns `(X, U, V)`.
pub fn sparse_binary_matrix(
    shape: (usize, usize),
    k: usize,
    w: f64,
    rng: &mut impl Rng,
) -> (CsMat<f64>, Array2<f64>, Array2<f64>) {
    let (m, n) = shape;
    let u = Array2::random_using((m, k), Uniform::new(0., 1.), rng);
    let v = Array2::random_using((n, k), Uniform::new(0., 1.), rng);
    let scores = u.dot(&v.t());

    let mut tri = TriMat::new(shape);
    for (i, row) in scores.rows().into_iter().enumerate() {
        let threshold = quantile(row.to_vec(), w);
        for (j, &score) in row.iter().enumerate() {
            if score > threshold {
                tri.add_triplet(i, j, 1.0);
            }
        }
    }

    (tri.to_csr(), u, v)
}

/// `w`-quantile with linear interpolation between order statistics
fn quantile(mut values: Vec<f64>, w: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let pos = w.max(0.0).min(1.0) * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(values.len() - 1);
    values[lo] + (pos - lo as f64) * (values[hi] - values[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn low_rank_entries_match_factors() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (x, u, s, v) = sparse_low_rank((20, 30), 3, 50, &mut rng);

        assert_eq!(x.shape(), (20, 30));
        assert_eq!(x.nnz(), 50);
        assert_eq!(u.dim(), (20, 3));
        assert_eq!(v.dim(), (30, 3));

        let z = (&u * &s).dot(&v.t());
        for (val, (i, j)) in x.iter() {
            assert!((val - z[(i, j)]).abs() < 1e-12);
        }
    }

    #[test]
    fn too_many_entries_fill_the_matrix() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (x, _, _, _) = sparse_low_rank((3, 4), 2, 100, &mut rng);
        assert_eq!(x.nnz(), 12);
    }

    #[test]
    fn binary_rows_keep_the_top_scores() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (x, u, v) = sparse_binary_matrix((10, 21), 4, 0.5, &mut rng);
        let scores = u.dot(&v.t());

        for (i, row) in x.outer_iterator().enumerate() {
            // 21 distinct scores, the median itself is not strictly above the median
            assert_eq!(row.nnz(), 10);
            let min_in = row.indices().iter().map(|&j| scores[(i, j)]).fold(f64::MAX, f64::min);
            let max_out = (0..21)
                .filter(|j| !row.indices().contains(j))
                .map(|j| scores[(i, j)])
                .fold(f64::MIN, f64::max);
            assert!(min_in > max_out);
        }
    }

    #[test]
    fn quantile_interpolates() {
        assert_eq!(quantile(vec![3.0, 1.0, 2.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile(vec![3.0, 1.0], 1.0), 3.0);
        assert_eq!(quantile(vec![3.0, 1.0], 0.0), 1.0);
    }
}
