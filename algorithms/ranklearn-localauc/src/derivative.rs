//! Derivatives of the objective with respect to single rows of `U` and `V`
//!
//! Every derivative is the ridge term plus the derivative of the average pairwise loss. Exact
//! derivatives enumerate every pair of `omega_i x omega_bar_i`, sampled derivatives average
//! `num_samples` pairs drawn uniformly with replacement and are unbiased estimates of the exact
//! ones. Users without any observed or any unobserved item only contribute the ridge term.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use ranklearn::error::Error;
use ranklearn::omega::OmegaIndex;
use ranklearn::Float;

use crate::error::Result;
use crate::loss::Loss;

/// Snapshot of the factors against which a batch of row derivatives is computed
///
/// All derivatives of one sweep are taken against the same snapshot and applied afterwards.
pub struct Gradient<'a, F: Float> {
    omega: &'a OmegaIndex,
    u: ArrayView2<'a, F>,
    v: ArrayView2<'a, F>,
    r: ArrayView1<'a, F>,
    lambda: F,
    loss: Loss,
    scores: Option<Array2<F>>,
}

impl<'a, F: Float> Gradient<'a, F> {
    pub fn new(
        omega: &'a OmegaIndex,
        u: ArrayView2<'a, F>,
        v: ArrayView2<'a, F>,
        r: ArrayView1<'a, F>,
        lambda: F,
        loss: Loss,
    ) -> Result<Self> {
        let (m, n) = (omega.nrows(), omega.ncols());
        if u.nrows() != m || v.nrows() != n || u.ncols() != v.ncols() || r.len() != m {
            return Err(Error::ShapeMismatch {
                expected: (m, n),
                found: (u.nrows(), v.nrows()),
            }
            .into());
        }

        Ok(Gradient {
            omega,
            u,
            v,
            r,
            lambda,
            loss,
            scores: None,
        })
    }

    /// Caches the full score matrix `U V^T`, which the exact derivatives read many times
    pub fn with_scores(mut self) -> Self {
        self.scores = Some(self.u.dot(&self.v.t()));
        self
    }

    fn score(&self, i: usize, j: usize) -> F {
        match &self.scores {
            Some(scores) => scores[(i, j)],
            None => self.u.row(i).dot(&self.v.row(j)),
        }
    }

    fn row_scores(&self, i: usize) -> Array1<F> {
        match &self.scores {
            Some(scores) => scores.row(i).to_owned(),
            None => self.v.dot(&self.u.row(i)),
        }
    }

    /// Exact derivative with respect to `U[i]`
    pub fn derivative_ui(&self, i: usize) -> Array1<F> {
        let grad = self.u.row(i).to_owned() * self.lambda;
        if !self.omega.has_pairs(i) {
            return grad;
        }

        let scores = self.row_scores(i);
        let positives = self.omega.row(i);
        let negatives = self.omega.complement(i);
        let n_pairs = F::cast(positives.len() * negatives.len());
        let m = F::cast(self.omega.nrows());

        // the pair derivatives are accumulated per item before touching V
        let mut weights = Array1::<F>::zeros(self.v.nrows());
        for &p in positives {
            for &q in &negatives {
                let (dp, dq) = self.loss.gradient(scores[p], scores[q], self.r[i]);
                weights[p] += dp;
                weights[q] += dq;
            }
        }

        grad + self.v.t().dot(&weights) / (n_pairs * m)
    }

    /// Derivative with respect to `U[i]` estimated from `num_samples` pairs
    pub fn derivative_ui_approx<R: Rng>(
        &self,
        i: usize,
        num_samples: usize,
        rng: &mut R,
    ) -> Array1<F> {
        let mut grad = self.u.row(i).to_owned() * self.lambda;
        if !self.omega.has_pairs(i) || num_samples == 0 {
            return grad;
        }

        let positives = self.omega.row(i);
        let n_negatives = self.omega.complement_len(i);
        let mut sum = Array1::zeros(self.u.ncols());

        for _ in 0..num_samples {
            let p = positives[rng.gen_range(0..positives.len())];
            let q = self.omega.nth_complement(i, rng.gen_range(0..n_negatives));
            let (dp, dq) = self
                .loss
                .gradient(self.score(i, p), self.score(i, q), self.r[i]);

            sum.scaled_add(dp, &self.v.row(p));
            sum.scaled_add(dq, &self.v.row(q));
        }

        let m = self.omega.nrows();
        grad.scaled_add(F::one() / F::cast(num_samples * m), &sum);
        grad
    }

    /// Exact derivative with respect to `V[j]`
    pub fn derivative_vi(&self, j: usize) -> Array1<F> {
        let mut grad = self.v.row(j).to_owned() * self.lambda;
        let m = self.omega.nrows();
        let mut sum = Array1::zeros(self.v.ncols());

        for i in 0..m {
            if !self.omega.has_pairs(i) {
                continue;
            }

            let positives = self.omega.row(i);
            let n_pairs = F::cast(positives.len() * self.omega.complement_len(i));
            let sj = self.score(i, j);
            let ri = self.r[i];

            let weight = if self.omega.contains(i, j) {
                self.omega
                    .complement(i)
                    .into_iter()
                    .map(|q| self.loss.gradient(sj, self.score(i, q), ri).0)
                    .sum::<F>()
            } else {
                positives
                    .iter()
                    .map(|&p| self.loss.gradient(self.score(i, p), sj, ri).1)
                    .sum::<F>()
            };

            sum.scaled_add(weight / n_pairs, &self.u.row(i));
        }

        grad.scaled_add(F::one() / F::cast(m), &sum);
        grad
    }

    /// Derivative with respect to `V[j]` estimated from `num_samples` users, each paired with
    /// one item drawn from the opposite side of their partition
    pub fn derivative_vi_approx<R: Rng>(
        &self,
        j: usize,
        num_samples: usize,
        rng: &mut R,
    ) -> Array1<F> {
        let mut grad = self.v.row(j).to_owned() * self.lambda;
        let m = self.omega.nrows();
        if num_samples == 0 {
            return grad;
        }

        let mut sum = Array1::zeros(self.v.ncols());
        for _ in 0..num_samples {
            let i = rng.gen_range(0..m);
            if !self.omega.has_pairs(i) {
                continue;
            }

            let positives = self.omega.row(i);
            let n_negatives = self.omega.complement_len(i);
            let sj = self.score(i, j);
            let ri = self.r[i];

            // one sampled counterpart stands for the mean over its whole set
            let weight = if self.omega.contains(i, j) {
                let q = self.omega.nth_complement(i, rng.gen_range(0..n_negatives));
                self.loss.gradient(sj, self.score(i, q), ri).0 / F::cast(positives.len())
            } else {
                let p = positives[rng.gen_range(0..positives.len())];
                self.loss.gradient(self.score(i, p), sj, ri).1 / F::cast(n_negatives)
            };

            sum.scaled_add(weight, &self.u.row(i));
        }

        let m = self.omega.nrows();
        grad.scaled_add(F::one() / F::cast(num_samples * m), &sum);
        grad
    }
}
