//! The penalised objective minimised by MaxLocalAUC
//!
//! `0.5 lambda (||U||_F^2 + ||V||_F^2) + 1/m sum_i mean_{(p, q) in omega_i x omega_bar_i} l(p, q)`
//!
//! For the sigmoid loss the second term is minus a smooth approximation of the local AUC.

use ndarray::{ArrayView1, ArrayView2};
use rand::Rng;
use ranklearn::error::Error;
use ranklearn::omega::OmegaIndex;
use ranklearn::Float;

use crate::error::Result;
use crate::loss::Loss;

fn check_shapes<F: Float>(
    omega: &OmegaIndex,
    u: &ArrayView2<F>,
    v: &ArrayView2<F>,
    r: &ArrayView1<F>,
) -> Result<()> {
    let (m, n) = (omega.nrows(), omega.ncols());
    if u.nrows() != m || v.nrows() != n || u.ncols() != v.ncols() || r.len() != m {
        return Err(Error::ShapeMismatch {
            expected: (m, n),
            found: (u.nrows(), v.nrows()),
        }
        .into());
    }
    Ok(())
}

fn penalty<F: Float>(u: &ArrayView2<F>, v: &ArrayView2<F>, lambda: F) -> F {
    let sq_norm = u.iter().chain(v.iter()).map(|&a| a * a).sum::<F>();
    F::cast(0.5) * lambda * sq_norm
}

/// Exact objective, averaging the loss over every pair
pub fn objective<F: Float>(
    omega: &OmegaIndex,
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    r: ArrayView1<F>,
    lambda: F,
    loss: Loss,
) -> Result<F> {
    check_shapes(omega, &u, &v, &r)?;

    let mut total = F::zero();
    for i in 0..omega.nrows() {
        if !omega.has_pairs(i) {
            continue;
        }

        let scores = v.dot(&u.row(i));
        let negatives = omega.complement(i);
        let n_pairs = F::cast(omega.row(i).len() * negatives.len());

        let row_loss = omega
            .row(i)
            .iter()
            .flat_map(|&p| negatives.iter().map(move |&q| (p, q)))
            .map(|(p, q)| loss.value(scores[p], scores[q], r[i]))
            .sum::<F>();
        total += row_loss / n_pairs;
    }

    Ok(penalty(&u, &v, lambda) + total / F::cast(omega.nrows()))
}

/// Objective with the loss of every user averaged over `num_samples` sampled pairs
#[allow(clippy::too_many_arguments)]
pub fn objective_approx<F: Float, R: Rng>(
    omega: &OmegaIndex,
    u: ArrayView2<F>,
    v: ArrayView2<F>,
    r: ArrayView1<F>,
    lambda: F,
    loss: Loss,
    num_samples: usize,
    rng: &mut R,
) -> Result<F> {
    check_shapes(omega, &u, &v, &r)?;
    if num_samples == 0 {
        return Err(Error::Parameters("number of AUC samples cannot be 0".to_string()).into());
    }

    let mut total = F::zero();
    for i in 0..omega.nrows() {
        if !omega.has_pairs(i) {
            continue;
        }

        let ui = u.row(i);
        let positives = omega.row(i);
        let n_negatives = omega.complement_len(i);

        let mut row_loss = F::zero();
        for _ in 0..num_samples {
            let p = positives[rng.gen_range(0..positives.len())];
            let q = omega.nth_complement(i, rng.gen_range(0..n_negatives));
            row_loss += loss.value(ui.dot(&v.row(p)), ui.dot(&v.row(q)), r[i]);
        }
        total += row_loss / F::cast(num_samples);
    }

    Ok(penalty(&u, &v, lambda) + total / F::cast(omega.nrows()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;
    use ranklearn::metrics::compute_r;
    use ranklearn_datasets::generate::sparse_binary_matrix;

    #[test]
    fn sigmoid_objective_by_hand() {
        // one user, item 0 observed, item 1 not, with s_0 = 1, s_1 = 0 and r = 0
        let omega = OmegaIndex::from_rows(vec![vec![0]], 2);
        let u = array![[1.0]];
        let v = array![[1.0], [0.0]];
        let r = array![0.0];

        let e = (-1.0f64).exp();
        let expected = 0.5 * 0.2 * 2.0 - 1.0 / ((1.0 + e) * (1.0 + e));
        let obj = objective(&omega, u.view(), v.view(), r.view(), 0.2, Loss::Sigmoid).unwrap();
        assert_abs_diff_eq!(obj, expected, epsilon = 1e-12);
    }

    #[test]
    fn hinge_objective_is_zero_for_separated_scores() {
        let omega = OmegaIndex::from_rows(vec![vec![0], vec![1]], 3);
        let u = array![[2.0, 0.0], [0.0, 2.0]];
        let v = array![[1.0, 0.0], [0.0, 1.0], [-1.0, -1.0]];
        let r = Array1::zeros(2);

        let obj = objective(&omega, u.view(), v.view(), r.view(), 0.0, Loss::Hinge).unwrap();
        assert_abs_diff_eq!(obj, 0.0);
    }

    #[test]
    fn sampled_objective_approaches_exact() {
        let mut rng = Xoshiro256Plus::seed_from_u64(8);
        let (x, u, v) = sparse_binary_matrix((20, 30), 3, 0.7, &mut rng);
        let omega = OmegaIndex::from_matrix(&x).unwrap();
        let u = u.mapv(|a| a - 0.5);
        let r = compute_r(u.view(), v.view(), 0.8);

        let exact = objective(&omega, u.view(), v.view(), r.view(), 0.01, Loss::Sigmoid).unwrap();
        let approx = objective_approx(
            &omega,
            u.view(),
            v.view(),
            r.view(),
            0.01,
            Loss::Sigmoid,
            5000,
            &mut rng,
        )
        .unwrap();
        assert_abs_diff_eq!(exact, approx, epsilon = 0.01);
    }
}
