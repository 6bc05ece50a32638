use std::time::{Duration, Instant};

use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use ranklearn::error::Error;
use ranklearn::metrics::{compute_r, local_auc_exact, local_auc_sampled};
use ranklearn::omega::OmegaIndex;
use ranklearn::svd::{truncated_svd, SvdSolver};
use ranklearn::traits::{FactorModel, Fit};
use ranklearn::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use sprs::CsMat;

use crate::derivative::Gradient;
use crate::error::{MaxLocalAucError, Result};
use crate::hyperparams::{
    Estimator, InitialAlg, MaxLocalAucParams, MaxLocalAucValidParams, Threshold,
};
use crate::objective::{objective, objective_approx};

/// How a training run ended
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Both factor matrices moved by at most `eps` during the last iteration
    Converged,
    /// `max_iterations` iterations were run
    MaxIterationsReached,
}

/// A low-rank ranking model fitted by maximising the local AUC
///
/// Besides the factors, the model keeps the trace of the run: the objective and local AUC
/// recorded every `record_step` iterations, the number of iterations, the training time and the
/// thresholds of the last iteration.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MaxLocalAuc<F> {
    u: Array2<F>,
    v: Array2<F>,
    objectives: Vec<F>,
    local_aucs: Vec<F>,
    n_iterations: usize,
    elapsed: Duration,
    termination: Termination,
    threshold: Array1<F>,
}

impl<F: Float> MaxLocalAuc<F> {
    /// Default hyperparameters for a rank-`k` model, seeded with 42
    pub fn params(k: usize) -> MaxLocalAucParams<F, Xoshiro256Plus> {
        MaxLocalAucParams::new(k, Xoshiro256Plus::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(k: usize, rng: R) -> MaxLocalAucParams<F, R> {
        MaxLocalAucParams::new(k, rng)
    }

    /// Objective values recorded during training, oldest first
    pub fn objectives(&self) -> &[F] {
        &self.objectives
    }

    /// Training local AUC recorded alongside every objective value
    pub fn local_aucs(&self) -> &[F] {
        &self.local_aucs
    }

    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    /// Wall-clock time of the iterations, initialisation excluded
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Thresholds `r` in effect at the end of training, one per user
    pub fn threshold(&self) -> &Array1<F> {
        &self.threshold
    }
}

impl<F: Float> FactorModel<F> for MaxLocalAuc<F> {
    fn user_factors(&self) -> ArrayView2<'_, F> {
        self.u.view()
    }

    fn item_factors(&self) -> ArrayView2<'_, F> {
        self.v.view()
    }
}

impl<F: Float, R: Rng + Clone> Fit<F, MaxLocalAucError> for MaxLocalAucValidParams<F, R> {
    type Object = MaxLocalAuc<F>;

    /// Learns `U` and `V` from the interaction matrix `x` with shape `(n_users, n_items)`
    fn fit(&self, x: &CsMat<F>) -> Result<Self::Object> {
        let mut rng = self.rng().clone();
        self.fit_with_rng(x, &mut rng)
    }
}

impl<F: Float, R: Rng> MaxLocalAucValidParams<F, R> {
    /// Runs the training loop, drawing every random number from `rng`
    pub(crate) fn fit_with_rng<G: Rng>(
        &self,
        x: &CsMat<F>,
        rng: &mut G,
    ) -> Result<MaxLocalAuc<F>> {
        let omega = OmegaIndex::from_matrix(x)?;
        let (m, n) = (omega.nrows(), omega.ncols());

        if let Threshold::Fixed(r) = self.threshold() {
            if r.len() != m {
                return Err(MaxLocalAucError::ThresholdLength {
                    expected: m,
                    found: r.len(),
                });
            }
        }

        let (mut u, mut v) = self.initial_factors(x, rng)?;
        debug!(
            "initialised {}x{} and {}x{} factors with {}",
            m,
            self.k(),
            n,
            self.k(),
            self.init()
        );
        debug!("{}", self);

        let mut objectives = Vec::new();
        let mut local_aucs = Vec::new();
        let mut termination = Termination::MaxIterationsReached;
        let mut n_iterations = 0;
        let start = Instant::now();

        for iteration in 0..self.max_iterations() {
            let sigma = self.learning_rate(iteration);
            let r = self.thresholds(u.view(), v.view());
            let (last_u, last_v) = (u.clone(), v.clone());

            for _ in 0..self.iterations_per_update() {
                let users = self.select_rows(m, rng);
                let d_u: Vec<Array1<F>> = {
                    let grad = self.gradient(&omega, &u, &v, &r)?;
                    users
                        .iter()
                        .map(|&i| match self.derivative() {
                            Estimator::Exact => grad.derivative_ui(i),
                            Estimator::Sampled => {
                                grad.derivative_ui_approx(i, self.num_auc_samples(), rng)
                            }
                        })
                        .collect()
                };
                for (&i, d) in users.iter().zip(d_u.iter()) {
                    u.row_mut(i).scaled_add(-sigma, d);
                }

                let items = self.select_rows(n, rng);
                let d_v: Vec<Array1<F>> = {
                    let grad = self.gradient(&omega, &u, &v, &r)?;
                    items
                        .iter()
                        .map(|&j| match self.derivative() {
                            Estimator::Exact => grad.derivative_vi(j),
                            Estimator::Sampled => {
                                grad.derivative_vi_approx(j, self.num_auc_samples(), rng)
                            }
                        })
                        .collect()
                };
                for (&j, d) in items.iter().zip(d_v.iter()) {
                    v.row_mut(j).scaled_add(-sigma, d);
                }
            }

            let delta_u = frobenius(&(&u - &last_u));
            let delta_v = frobenius(&(&v - &last_v));
            n_iterations = iteration + 1;

            if iteration % self.record_step() == 0 {
                let (obj, auc) = self.evaluate(&omega, &u, &v, &r, rng)?;
                objectives.push(obj);
                local_aucs.push(auc);
                debug!(
                    "iteration {}: local AUC~{} objective~{} ||dU||={} ||dV||={}",
                    iteration, auc, obj, delta_u, delta_v
                );
            }

            if delta_u <= self.eps() && delta_v <= self.eps() {
                termination = Termination::Converged;
                break;
            }
        }

        let elapsed = start.elapsed();
        debug!(
            "finished after {} iterations ({:?}) in {:?}",
            n_iterations, termination, elapsed
        );

        let threshold = self.thresholds(u.view(), v.view());
        Ok(MaxLocalAuc {
            u,
            v,
            objectives,
            local_aucs,
            n_iterations,
            elapsed,
            termination,
            threshold,
        })
    }

    fn initial_factors<G: Rng>(
        &self,
        x: &CsMat<F>,
        rng: &mut G,
    ) -> Result<(Array2<F>, Array2<F>)> {
        let (m, n) = x.shape();
        let k = self.k();

        match self.init() {
            InitialAlg::Rand => {
                let dist = Uniform::new(F::zero(), F::one());
                let u = Array2::random_using((m, k), &dist, rng);
                let v = Array2::random_using((n, k), &dist, rng);
                Ok((u, v))
            }
            InitialAlg::Ones => Ok((Array2::ones((m, k)), Array2::ones((n, k)))),
            InitialAlg::Svd => {
                if k > m.min(n) {
                    return Err(MaxLocalAucError::SvdRank { k, max: m.min(n) });
                }
                let (u, _, v) = match truncated_svd(x, k, SvdSolver::Lobpcg) {
                    Err(Error::SolverUnavailable(name)) => {
                        debug!("{} solver unavailable, falling back to dense SVD", name);
                        truncated_svd(x, k, SvdSolver::Dense)?
                    }
                    res => res?,
                };
                Ok((u, v))
            }
        }
    }

    fn thresholds(&self, u: ArrayView2<F>, v: ArrayView2<F>) -> Array1<F> {
        match self.threshold() {
            Threshold::Fixed(r) => r.clone(),
            Threshold::Quantile(top) => compute_r(u, v, F::one() - *top),
        }
    }

    /// Rows updated by one sweep: all of them, or a random subset when stochastic
    fn select_rows<G: Rng>(&self, n_rows: usize, rng: &mut G) -> Vec<usize> {
        if self.stochastic() {
            index::sample(rng, n_rows, self.num_row_samples().min(n_rows)).into_vec()
        } else {
            (0..n_rows).collect()
        }
    }

    fn gradient<'a>(
        &self,
        omega: &'a OmegaIndex,
        u: &'a Array2<F>,
        v: &'a Array2<F>,
        r: &'a Array1<F>,
    ) -> Result<Gradient<'a, F>> {
        let grad = Gradient::new(
            omega,
            u.view(),
            v.view(),
            r.view(),
            self.lambda(),
            self.loss(),
        )?;
        Ok(match self.derivative() {
            Estimator::Exact => grad.with_scores(),
            Estimator::Sampled => grad,
        })
    }

    /// Objective and local AUC of the current factors
    fn evaluate<G: Rng>(
        &self,
        omega: &OmegaIndex,
        u: &Array2<F>,
        v: &Array2<F>,
        r: &Array1<F>,
        rng: &mut G,
    ) -> Result<(F, F)> {
        let (u, v, r) = (u.view(), v.view(), r.view());
        match self.evaluation() {
            Estimator::Exact => Ok((
                objective(omega, u, v, r, self.lambda(), self.loss())?,
                local_auc_exact(omega, u, v, r)?,
            )),
            Estimator::Sampled => {
                let n_samples = self.num_auc_samples();
                let obj = objective_approx(
                    omega,
                    u,
                    v,
                    r,
                    self.lambda(),
                    self.loss(),
                    n_samples,
                    rng,
                )?;
                let auc = local_auc_sampled(omega, u, v, r, n_samples, rng)?;
                Ok((obj, auc))
            }
        }
    }
}

fn frobenius<F: Float>(a: &Array2<F>) -> F {
    a.iter().map(|&x| x * x).sum::<F>().sqrt()
}
