//! Common metrics for ranking
//!
//! All metrics score a factor model `(U, V)` against a sparse matrix of held-out interactions.
//! The AUC family compares, for every user `i`, observed items `p` in `omega_i` with unobserved
//! items `q` in `omega_bar_i`. The *local* AUC only credits a pair when the observed item is also
//! scored above the user's threshold `r_i`, which focuses the metric on the top of the ranking.
//!
//! Users without any observed or without any unobserved item contribute zero to the AUC family
//! but still count in the average over users. The top-k metrics average over users with at least
//! one held-out item and return NaN if there is none.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use sprs::CsMat;
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::omega::OmegaIndex;
use crate::Float;

fn check_factors<F: Float>(
    omega: &OmegaIndex,
    u: &ArrayView2<F>,
    v: &ArrayView2<F>,
) -> Result<()> {
    if u.nrows() != omega.nrows() || v.nrows() != omega.ncols() || u.ncols() != v.ncols() {
        return Err(Error::ShapeMismatch {
            expected: (omega.nrows(), omega.ncols()),
            found: (u.nrows(), v.nrows()),
        });
    }
    Ok(())
}

/// Per-user thresholds at quantile `w` of the predicted scores
///
/// `r_i` is the `w`-percentile, with linear interpolation between order statistics, of row `i`
/// of `U V^T`. `w = 1` gives the largest score of the row, `w = 0` the smallest.
pub fn compute_r<F: Float>(u: ArrayView2<F>, v: ArrayView2<F>, w: F) -> Array1<F> {
    let w = w.max(F::zero()).min(F::one());
    let n = v.nrows();
    if n == 0 {
        return Array1::zeros(u.nrows());
    }

    u.rows()
        .into_iter()
        .map(|ui| {
            let mut scores = v.dot(&ui).to_vec();
            scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

            let pos = w * F::cast(n - 1);
            let lo = pos.floor().as_().min(n - 1);
            let hi = (lo + 1).min(n - 1);
            let frac = pos - F::cast(lo);
            scores[lo] + frac * (scores[hi] - scores[lo])
        })
        .collect()
}

/// Exact local AUC of `(U, V)` on the entries of `omega`, with per-user thresholds `r`
///
/// Enumerates every pair of `omega_i x omega_bar_i`; a pair counts when
/// `s_p > s_q` and `s_p > r_i`.
pub fn local_auc_exact<F: Float>(
    omega: &OmegaIndex,
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    r: ArrayView1<F>,
) -> Result<F> {
    check_factors(omega, &u, &v)?;

    let mut total = F::zero();
    for i in 0..omega.nrows() {
        if !omega.has_pairs(i) {
            continue;
        }

        let scores = v.dot(&u.row(i));
        let positives = omega.row(i);
        let mut negatives: Vec<F> = omega.complement(i).into_iter().map(|q| scores[q]).collect();
        negatives.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let hits: usize = positives
            .iter()
            .map(|&p| scores[p])
            .filter(|&sp| sp > r[i])
            .map(|sp| negatives.partition_point(|&sq| sq < sp))
            .sum();

        total += F::cast(hits) / F::cast(positives.len() * negatives.len());
    }

    Ok(total / F::cast(omega.nrows()))
}

/// Sampled local AUC: `num_samples` pairs per user are drawn uniformly with replacement from
/// `omega_i x omega_bar_i` and the pair indicator is averaged
pub fn local_auc_sampled<F: Float, R: Rng>(
    omega: &OmegaIndex,
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    r: ArrayView1<F>,
    num_samples: usize,
    rng: &mut R,
) -> Result<F> {
    check_factors(omega, &u, &v)?;
    if num_samples == 0 {
        return Err(Error::Parameters("number of AUC samples cannot be 0".to_string()));
    }

    let mut total = F::zero();
    for i in 0..omega.nrows() {
        if !omega.has_pairs(i) {
            continue;
        }

        let ui = u.row(i);
        let positives = omega.row(i);
        let n_negatives = omega.complement_len(i);

        let mut hits = 0usize;
        for _ in 0..num_samples {
            let p = positives[rng.gen_range(0..positives.len())];
            let q = omega.nth_complement(i, rng.gen_range(0..n_negatives));
            let sp = ui.dot(&v.row(p));
            let sq = ui.dot(&v.row(q));
            if sp > sq && sp > r[i] {
                hits += 1;
            }
        }

        total += F::cast(hits) / F::cast(num_samples);
    }

    Ok(total / F::cast(omega.nrows()))
}

/// Exact local AUC on the held-out matrix `test`, crediting only items ranked in the top
/// fraction `top` of each user's scores
///
/// `top = 1` reduces to the plain AUC and `top = 0` always gives 0.
pub fn local_auc<F: Float>(
    test: &CsMat<F>,
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    top: F,
) -> Result<F> {
    let omega = OmegaIndex::from_matrix(test)?;
    let r = compute_r(u, v, F::one() - top);
    local_auc_exact(&omega, u, v, r.view())
}

/// Sampled counterpart of [`local_auc`]
pub fn local_auc_approx<F: Float, R: Rng>(
    test: &CsMat<F>,
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    top: F,
    num_samples: usize,
    rng: &mut R,
) -> Result<F> {
    let omega = OmegaIndex::from_matrix(test)?;
    let r = compute_r(u, v, F::one() - top);
    local_auc_sampled(&omega, u, v, r.view(), num_samples, rng)
}

/// Mean per-user AUC, ties counted as misses
pub fn auc<F: Float>(test: &CsMat<F>, u: ArrayView2<F>, v: ArrayView2<F>) -> Result<F> {
    let omega = OmegaIndex::from_matrix(test)?;
    let r = Array1::from_elem(u.nrows(), F::neg_infinity());
    local_auc_exact(&omega, u, v, r.view())
}

/// The `k` best scored items of every user, best first
///
/// Returns an array of shape `(n_users, min(k, n_items))`. Items stored in `exclude` are ranked
/// after every other item, so they only appear when a user has fewer than `k` candidates.
pub fn recommend_at_k<F: Float>(
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    k: usize,
    exclude: Option<&OmegaIndex>,
) -> Array2<usize> {
    let k = k.min(v.nrows());
    let mut out = Array2::zeros((u.nrows(), k));

    for (i, mut out_row) in out.rows_mut().into_iter().enumerate() {
        let scores = v.dot(&u.row(i));
        let mut items: Vec<(bool, F, usize)> = scores
            .iter()
            .enumerate()
            .map(|(j, &s)| (exclude.map_or(false, |omega| omega.contains(i, j)), s, j))
            .collect();

        // excluded items last, then by decreasing score, ties broken by item index
        items.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                .then(a.2.cmp(&b.2))
        });
        for (slot, item) in out_row.iter_mut().zip(items) {
            *slot = item.2;
        }
    }

    out
}

/// Applies `per_user(relevant items, ranked items)` to every user with held-out items and
/// averages the results
fn mean_over_users<F: Float, G>(
    test: &CsMat<F>,
    ordered_items: ArrayView2<usize>,
    k: usize,
    per_user: G,
) -> Result<F>
where
    G: Fn(&[usize], &[usize]) -> F,
{
    let omega = OmegaIndex::from_matrix(test)?;
    if ordered_items.nrows() != omega.nrows() {
        return Err(Error::ShapeMismatch {
            expected: (omega.nrows(), k),
            found: ordered_items.dim(),
        });
    }
    if k == 0 || k > ordered_items.ncols() {
        return Err(Error::Parameters(format!(
            "k = {} not in [1, {}]",
            k,
            ordered_items.ncols()
        )));
    }

    let mut total = F::zero();
    let mut n_users = 0;
    for (i, ranked) in ordered_items.rows().into_iter().enumerate() {
        let relevant = omega.row(i);
        if relevant.is_empty() {
            continue;
        }
        let ranked = ranked.to_vec();
        total += per_user(relevant, &ranked[..k]);
        n_users += 1;
    }

    if n_users == 0 {
        Ok(F::nan())
    } else {
        Ok(total / F::cast(n_users))
    }
}

fn hits(relevant: &[usize], top: &[usize]) -> usize {
    top.iter().filter(|j| relevant.binary_search(j).is_ok()).count()
}

/// Fraction of the top `k` items which are held-out items
pub fn precision_at_k<F: Float>(
    test: &CsMat<F>,
    ordered_items: ArrayView2<usize>,
    k: usize,
) -> Result<F> {
    mean_over_users(test, ordered_items, k, |relevant, top| {
        F::cast(hits(relevant, top)) / F::cast(top.len())
    })
}

/// Fraction of the held-out items found in the top `k`
pub fn recall_at_k<F: Float>(
    test: &CsMat<F>,
    ordered_items: ArrayView2<usize>,
    k: usize,
) -> Result<F> {
    mean_over_users(test, ordered_items, k, |relevant, top| {
        F::cast(hits(relevant, top)) / F::cast(relevant.len())
    })
}

/// Harmonic mean of precision and recall at `k`, computed per user and then averaged
pub fn f1_at_k<F: Float>(test: &CsMat<F>, ordered_items: ArrayView2<usize>, k: usize) -> Result<F> {
    mean_over_users(test, ordered_items, k, |relevant, top| {
        let n_hits = hits(relevant, top);
        if n_hits == 0 {
            return F::zero();
        }
        let precision = F::cast(n_hits) / F::cast(top.len());
        let recall = F::cast(n_hits) / F::cast(relevant.len());
        F::cast(2) * precision * recall / (precision + recall)
    })
}

/// Mean reciprocal rank of the first held-out item within the top `k`, zero if there is none
pub fn mrr_at_k<F: Float>(
    test: &CsMat<F>,
    ordered_items: ArrayView2<usize>,
    k: usize,
) -> Result<F> {
    mean_over_users(test, ordered_items, k, |relevant, top| {
        top.iter()
            .position(|j| relevant.binary_search(j).is_ok())
            .map_or(F::zero(), |rank| F::one() / F::cast(rank + 1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::from_triplets;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;
    use ranklearn_datasets::generate::sparse_low_rank;

    fn binarize(x: &CsMat<f64>) -> CsMat<f64> {
        x.map(|v| if *v != 0.0 { 1.0 } else { 0.0 })
    }

    #[test]
    fn quantiles_of_scores() {
        let u = array![[1.0], [2.0]];
        let v = array![[1.0], [4.0], [2.0], [3.0]];

        assert_abs_diff_eq!(compute_r(u.view(), v.view(), 1.0), array![4.0, 8.0]);
        assert_abs_diff_eq!(compute_r(u.view(), v.view(), 0.0), array![1.0, 2.0]);
        assert_abs_diff_eq!(compute_r(u.view(), v.view(), 0.5), array![2.5, 5.0]);
    }

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let x = from_triplets((2, 3), &[(0, 0, 1.0), (1, 2, 1.0)]).unwrap();
        let u = array![[1.0, 0.0], [0.0, 1.0]];
        let v = array![[1.0, 0.0], [0.0, 0.0], [0.0, 1.0]];

        assert_abs_diff_eq!(auc(&x, u.view(), v.view()).unwrap(), 1.0);
        assert_abs_diff_eq!(local_auc(&x, u.view(), v.view(), 1.0).unwrap(), 1.0);
    }

    #[test]
    fn empty_rows_count_as_zero() {
        // user 1 has no observed item and user 2 observes everything
        let x = from_triplets((3, 2), &[(0, 0, 1.0), (2, 0, 1.0), (2, 1, 1.0)]).unwrap();
        let u = array![[1.0], [1.0], [1.0]];
        let v = array![[2.0], [1.0]];

        assert_abs_diff_eq!(auc(&x, u.view(), v.view()).unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn local_auc_vanishes_without_top_items() {
        let mut rng = Xoshiro256Plus::seed_from_u64(21);
        let (x, u, _, v) = sparse_low_rank((10, 20), 2, 100, &mut rng);
        let x = binarize(&x);

        assert_eq!(local_auc(&x, u.view(), v.view(), 0.0).unwrap(), 0.0);
        assert_eq!(
            local_auc_approx(&x, u.view(), v.view(), 0.0, 50, &mut rng).unwrap(),
            0.0
        );
    }

    #[test]
    fn sampled_local_auc_approaches_exact() {
        let mut rng = Xoshiro256Plus::seed_from_u64(21);
        let (x, u, _, v) = sparse_low_rank((100, 200), 2, 100, &mut rng);
        let x = binarize(&x);

        let exact = local_auc(&x, u.view(), v.view(), 1.0).unwrap();
        for num_samples in (50..200).step_by(10) {
            let approx =
                local_auc_approx(&x, u.view(), v.view(), 1.0, num_samples, &mut rng).unwrap();
            assert_abs_diff_eq!(approx, exact, epsilon = 0.1);
        }
    }

    #[test]
    fn exact_local_auc_matches_pair_enumeration() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let (x, u, _, v) = sparse_low_rank((15, 12), 3, 60, &mut rng);
        let x = binarize(&x);
        let omega = OmegaIndex::from_matrix(&x).unwrap();
        let r = compute_r(u.view(), v.view(), 0.6);
        let z = u.dot(&v.t());

        let mut expected = 0.0;
        for i in 0..omega.nrows() {
            if !omega.has_pairs(i) {
                continue;
            }
            let negatives = omega.complement(i);
            let mut count = 0.0;
            for &p in omega.row(i) {
                for &q in &negatives {
                    if z[(i, p)] > z[(i, q)] && z[(i, p)] > r[i] {
                        count += 1.0;
                    }
                }
            }
            expected += count / (omega.row(i).len() * negatives.len()) as f64;
        }
        expected /= omega.nrows() as f64;

        let exact = local_auc_exact(&omega, u.view(), v.view(), r.view()).unwrap();
        assert_abs_diff_eq!(exact, expected, epsilon = 1e-12);
    }

    #[test]
    fn factor_shapes_are_checked() {
        let omega = OmegaIndex::from_rows(vec![vec![0]], 2);
        let u = Array2::<f64>::ones((1, 2));
        let v = Array2::<f64>::ones((3, 2));
        let r = Array1::zeros(1);

        assert!(local_auc_exact(&omega, u.view(), v.view(), r.view()).is_err());
    }

    #[test]
    fn recommendations_skip_excluded_items() {
        let u = array![[1.0], [-1.0]];
        let v = array![[3.0], [1.0], [2.0]];

        let ranked = recommend_at_k(u.view(), v.view(), 2, None);
        assert_eq!(ranked, array![[0, 2], [1, 2]]);

        let seen = OmegaIndex::from_rows(vec![vec![0], vec![]], 3);
        let ranked = recommend_at_k(u.view(), v.view(), 3, Some(&seen));
        assert_eq!(ranked, array![[2, 1, 0], [1, 2, 0]]);
    }

    #[test]
    fn top_k_metrics() {
        let test = from_triplets((3, 4), &[(0, 1, 1.0), (0, 3, 1.0), (1, 0, 1.0)]).unwrap();
        let ranked = array![[1, 2, 3, 0], [2, 3, 1, 0], [0, 1, 2, 3]];

        // user 2 has no held-out item and is ignored
        let precision: f64 = precision_at_k(&test, ranked.view(), 2).unwrap();
        assert_abs_diff_eq!(precision, (0.5 + 0.0) / 2.0);

        let recall: f64 = recall_at_k(&test, ranked.view(), 3).unwrap();
        assert_abs_diff_eq!(recall, (1.0 + 0.0) / 2.0);

        let f1: f64 = f1_at_k(&test, ranked.view(), 2).unwrap();
        assert_abs_diff_eq!(f1, (0.5 + 0.0) / 2.0);

        let mrr: f64 = mrr_at_k(&test, ranked.view(), 4).unwrap();
        assert_abs_diff_eq!(mrr, (1.0 + 0.25) / 2.0);

        assert!(precision_at_k::<f64>(&test, ranked.view(), 5).is_err());
    }

    #[test]
    fn top_k_metrics_without_test_items_are_nan() {
        let test = from_triplets::<f64>((2, 3), &[]).unwrap();
        let ranked = array![[0, 1], [1, 0]];
        assert!(f1_at_k(&test, ranked.view(), 2).unwrap().is_nan());
    }
}
