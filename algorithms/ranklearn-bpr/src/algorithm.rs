use std::time::{Duration, Instant};

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use ranklearn::metrics::local_auc_approx;
use ranklearn::omega::OmegaIndex;
use ranklearn::traits::{FactorModel, Fit};
use ranklearn::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use sprs::CsMat;

use crate::error::{BprError, Result};
use crate::hyperparams::{BprParams, BprValidParams};

/// Logistic weight `1 / (1 + exp(x))` of a pairwise score difference, with the exponent clamped
fn logistic_weight<F: Float>(x: F) -> F {
    let limit = F::cast(50);
    F::one() / (F::one() + x.max(-limit).min(limit).exp())
}

/// A low-rank ranking model fitted with Bayesian Personalized Ranking
///
/// Keeps the training local AUC (estimated over the whole ranking) recorded every
/// `record_step` epochs.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Bpr<F> {
    u: Array2<F>,
    v: Array2<F>,
    local_aucs: Vec<F>,
    n_epochs: usize,
    elapsed: Duration,
}

impl<F: Float> Bpr<F> {
    /// Default hyperparameters for a rank-`k` model, seeded with 42
    pub fn params(k: usize) -> BprParams<F, Xoshiro256Plus> {
        BprParams::new(k, Xoshiro256Plus::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(k: usize, rng: R) -> BprParams<F, R> {
        BprParams::new(k, rng)
    }

    pub fn local_aucs(&self) -> &[F] {
        &self.local_aucs
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl<F: Float> FactorModel<F> for Bpr<F> {
    fn user_factors(&self) -> ArrayView2<'_, F> {
        self.u.view()
    }

    fn item_factors(&self) -> ArrayView2<'_, F> {
        self.v.view()
    }
}

impl<F: Float, R: Rng + Clone> Fit<F, BprError> for BprValidParams<F, R> {
    type Object = Bpr<F>;

    fn fit(&self, x: &CsMat<F>) -> Result<Self::Object> {
        let mut rng = self.rng().clone();
        self.fit_with_rng(x, &mut rng)
    }
}

impl<F: Float, R: Rng> BprValidParams<F, R> {
    pub(crate) fn fit_with_rng<G: Rng>(&self, x: &CsMat<F>, rng: &mut G) -> Result<Bpr<F>> {
        let omega = OmegaIndex::from_matrix(x)?;
        let (m, n) = (omega.nrows(), omega.ncols());
        let k = self.k();

        let dist = Uniform::new(F::zero(), F::one());
        let mut u = Array2::random_using((m, k), &dist, rng);
        let mut v = Array2::random_using((n, k), &dist, rng);
        debug!("{}", self);

        let users: Vec<usize> = (0..m).filter(|&i| omega.has_pairs(i)).collect();
        if users.is_empty() {
            warn!("no user has both observed and unobserved items, returning initial factors");
        }
        let n_triples = if users.is_empty() { 0 } else { omega.nnz() };

        let gamma = self.learning_rate();
        let mut local_aucs = Vec::new();
        let start = Instant::now();

        for epoch in 0..self.max_iterations() {
            for _ in 0..n_triples {
                let i = users[rng.gen_range(0..users.len())];
                let positives = omega.row(i);
                let p = positives[rng.gen_range(0..positives.len())];
                let q = omega.nth_complement(i, rng.gen_range(0..omega.complement_len(i)));

                let ui: Array1<F> = u.row(i).to_owned();
                let diff = &v.row(p) - &v.row(q);
                let z = logistic_weight(ui.dot(&diff));

                let mut ui_mut = u.row_mut(i);
                ui_mut *= F::one() - gamma * self.lambda_user();
                ui_mut.scaled_add(gamma * z, &diff);

                let mut vp = v.row_mut(p);
                vp *= F::one() - gamma * self.lambda_pos();
                vp.scaled_add(gamma * z, &ui);

                let mut vq = v.row_mut(q);
                vq *= F::one() - gamma * self.lambda_neg();
                vq.scaled_add(-gamma * z, &ui);
            }

            if (epoch + 1) % self.record_step() == 0 {
                let auc = local_auc_approx(
                    x,
                    u.view(),
                    v.view(),
                    F::one(),
                    self.num_auc_samples(),
                    rng,
                )?;
                debug!("epoch {}: train local AUC {}", epoch + 1, auc);
                local_aucs.push(auc);
            }
        }

        Ok(Bpr {
            u,
            v,
            local_aucs,
            n_epochs: self.max_iterations(),
            elapsed: start.elapsed(),
        })
    }
}
