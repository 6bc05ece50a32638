use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use rand::Rng;
use ranklearn::{Float, ParamGuard};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::MaxLocalAucError;
use crate::loss::Loss;

/// Initialisation of the factor matrices
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialAlg {
    /// Entries drawn uniformly from `[0, 1)`
    Rand,
    /// All entries set to one
    Ones,
    /// Left and right singular vectors of a rank-`k` truncated SVD of the interactions
    Svd,
}

/// Step size schedule of the gradient updates
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LearningRate {
    /// Always `sigma`
    Constant,
    /// `1 / (alpha (t0 + iteration))`
    Optimal,
}

/// Whether a quantity is computed over all pairs or estimated from sampled pairs
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Estimator {
    Exact,
    Sampled,
}

/// Per-user score thresholds `r` which delimit the top of every ranking
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub enum Threshold<F> {
    /// A fixed vector with one threshold per user
    Fixed(Array1<F>),
    /// Thresholds recomputed from the current factors at the start of every iteration, such
    /// that a fraction `u` of every user's items scores above the threshold
    Quantile(F),
}

macro_rules! named_enum {
    ($ty:ident, $err:ident, $($variant:ident => $name:expr),+) => {
        impl $ty {
            pub fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = MaxLocalAucError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(MaxLocalAucError::$err(s.to_string())),
                }
            }
        }
    };
}

named_enum!(InitialAlg, UnknownInit, Rand => "rand", Ones => "ones", Svd => "svd");
named_enum!(LearningRate, UnknownRate, Constant => "constant", Optimal => "optimal");
named_enum!(Estimator, UnknownEstimator, Exact => "exact", Sampled => "sampled");

/// A verified hyper-parameter set ready for the estimation of a [MaxLocalAUC](crate::MaxLocalAuc)
/// model
///
/// See [`MaxLocalAucParams`] for the meaning and the defaults of every parameter.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MaxLocalAucValidParams<F: Float, R: Rng> {
    pub(crate) k: usize,
    pub(crate) lambda: F,
    pub(crate) eps: F,
    pub(crate) sigma: F,
    pub(crate) stochastic: bool,
    pub(crate) rate: LearningRate,
    pub(crate) alpha: F,
    pub(crate) t0: F,
    pub(crate) record_step: usize,
    pub(crate) derivative: Estimator,
    pub(crate) evaluation: Estimator,
    pub(crate) num_row_samples: usize,
    pub(crate) num_auc_samples: usize,
    pub(crate) max_iterations: usize,
    pub(crate) iterations_per_update: usize,
    pub(crate) init: InitialAlg,
    pub(crate) loss: Loss,
    pub(crate) threshold: Threshold<F>,
    pub(crate) folds: usize,
    pub(crate) ks: Vec<usize>,
    pub(crate) lambdas: Vec<F>,
    pub(crate) n_threads: usize,
    pub(crate) rng: R,
}

/// A helper struct used to construct a set of [valid hyperparameters](MaxLocalAucValidParams)
/// for [MaxLocalAUC](crate::MaxLocalAuc) using the builder pattern
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MaxLocalAucParams<F: Float, R: Rng>(pub(crate) MaxLocalAucValidParams<F, R>);

impl<F: Float, R: Rng> MaxLocalAucParams<F, R> {
    /// Rank-`k` model with the default parameters:
    /// * `lambda = 1e-7`, `eps = 0.1`, `sigma = 0.05`
    /// * constant learning rate, with `alpha = 2e-6` and `t0 = 100` for the optimal schedule
    /// * full (non stochastic) sweeps with `iterations_per_update = 10` and
    ///   `max_iterations = 100`
    /// * sampled derivatives and evaluation with `num_auc_samples = 100`
    /// * `num_row_samples = 10` for stochastic sweeps, `record_step = 10`
    /// * random initialisation, sigmoid loss, thresholds at the top 10% of every ranking
    /// * model selection over `ks = [10, 20, 50]` and `lambdas = [1e-7, 1e-6, 1e-5, 1e-4]` with 3
    ///   folds on every available core
    pub fn new(k: usize, rng: R) -> Self {
        Self(MaxLocalAucValidParams {
            k,
            lambda: F::cast(1e-7),
            eps: F::cast(0.1),
            sigma: F::cast(0.05),
            stochastic: false,
            rate: LearningRate::Constant,
            alpha: F::cast(2e-6),
            t0: F::cast(100),
            record_step: 10,
            derivative: Estimator::Sampled,
            evaluation: Estimator::Sampled,
            num_row_samples: 10,
            num_auc_samples: 100,
            max_iterations: 100,
            iterations_per_update: 10,
            init: InitialAlg::Rand,
            loss: Loss::Sigmoid,
            threshold: Threshold::Quantile(F::cast(0.1)),
            folds: 3,
            ks: vec![10, 20, 50],
            lambdas: [1e-7, 1e-6, 1e-5, 1e-4].iter().map(|&l| F::cast(l)).collect(),
            n_threads: 0,
            rng,
        })
    }

    /// Set the rank of the factor matrices
    pub fn k(mut self, k: usize) -> Self {
        self.0.k = k;
        self
    }

    /// Set the weight of the Frobenius penalty
    pub fn lambda(mut self, lambda: F) -> Self {
        self.0.lambda = lambda;
        self
    }

    /// Set the convergence tolerance: training stops once both `||U - U_prev||_F` and
    /// `||V - V_prev||_F` are at most `eps` after an iteration
    pub fn eps(mut self, eps: F) -> Self {
        self.0.eps = eps;
        self
    }

    /// Set the step size of the constant learning rate
    pub fn sigma(mut self, sigma: F) -> Self {
        self.0.sigma = sigma;
        self
    }

    /// Update only `num_row_samples` random rows of `U` and `V` per sweep instead of all rows
    pub fn stochastic(mut self, stochastic: bool) -> Self {
        self.0.stochastic = stochastic;
        self
    }

    pub fn rate(mut self, rate: LearningRate) -> Self {
        self.0.rate = rate;
        self
    }

    /// Set `alpha` of the optimal learning rate `1 / (alpha (t0 + iteration))`
    pub fn alpha(mut self, alpha: F) -> Self {
        self.0.alpha = alpha;
        self
    }

    /// Set `t0` of the optimal learning rate `1 / (alpha (t0 + iteration))`
    pub fn t0(mut self, t0: F) -> Self {
        self.0.t0 = t0;
        self
    }

    /// Record the objective and the local AUC every `record_step` iterations
    pub fn record_step(mut self, record_step: usize) -> Self {
        self.0.record_step = record_step;
        self
    }

    /// How the derivatives of the objective are computed
    pub fn derivative(mut self, derivative: Estimator) -> Self {
        self.0.derivative = derivative;
        self
    }

    /// How the recorded objective and local AUC, and the model selection scores, are computed
    pub fn evaluation(mut self, evaluation: Estimator) -> Self {
        self.0.evaluation = evaluation;
        self
    }

    pub fn num_row_samples(mut self, num_row_samples: usize) -> Self {
        self.0.num_row_samples = num_row_samples;
        self
    }

    /// Number of sampled pairs (or users for item derivatives) of every sampled estimate
    pub fn num_auc_samples(mut self, num_auc_samples: usize) -> Self {
        self.0.num_auc_samples = num_auc_samples;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }

    /// Number of update sweeps of `U` and `V` within one iteration
    pub fn iterations_per_update(mut self, iterations_per_update: usize) -> Self {
        self.0.iterations_per_update = iterations_per_update;
        self
    }

    pub fn init(mut self, init: InitialAlg) -> Self {
        self.0.init = init;
        self
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.0.loss = loss;
        self
    }

    /// Set the user thresholds, see [`Threshold`]
    pub fn threshold(mut self, threshold: Threshold<F>) -> Self {
        self.0.threshold = threshold;
        self
    }

    /// Number of cross validation folds of the model selection
    pub fn folds(mut self, folds: usize) -> Self {
        self.0.folds = folds;
        self
    }

    /// Candidate ranks of the model selection
    pub fn ks(mut self, ks: Vec<usize>) -> Self {
        self.0.ks = ks;
        self
    }

    /// Candidate penalties of the model selection
    pub fn lambdas(mut self, lambdas: Vec<F>) -> Self {
        self.0.lambdas = lambdas;
        self
    }

    /// Number of worker threads of the model selection, `0` uses every logical core
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.0.n_threads = n_threads;
        self
    }

    /// Set the random number generator used by initialisation, sampling and splitting
    pub fn with_rng<R2: Rng>(self, rng: R2) -> MaxLocalAucParams<F, R2> {
        let p = self.0;
        MaxLocalAucParams(MaxLocalAucValidParams {
            k: p.k,
            lambda: p.lambda,
            eps: p.eps,
            sigma: p.sigma,
            stochastic: p.stochastic,
            rate: p.rate,
            alpha: p.alpha,
            t0: p.t0,
            record_step: p.record_step,
            derivative: p.derivative,
            evaluation: p.evaluation,
            num_row_samples: p.num_row_samples,
            num_auc_samples: p.num_auc_samples,
            max_iterations: p.max_iterations,
            iterations_per_update: p.iterations_per_update,
            init: p.init,
            loss: p.loss,
            threshold: p.threshold,
            folds: p.folds,
            ks: p.ks,
            lambdas: p.lambdas,
            n_threads: p.n_threads,
            rng,
        })
    }
}

fn check_non_negative<F: Float>(
    x: F,
    err: fn(f32) -> MaxLocalAucError,
) -> Result<(), MaxLocalAucError> {
    if x.is_finite() && x >= F::zero() {
        Ok(())
    } else {
        Err(err(x.to_f32().unwrap_or(f32::NAN)))
    }
}

fn check_positive<F: Float>(
    x: F,
    err: fn(f32) -> MaxLocalAucError,
) -> Result<(), MaxLocalAucError> {
    if x.is_finite() && x > F::zero() {
        Ok(())
    } else {
        Err(err(x.to_f32().unwrap_or(f32::NAN)))
    }
}

impl<F: Float, R: Rng> ParamGuard for MaxLocalAucParams<F, R> {
    type Checked = MaxLocalAucValidParams<F, R>;
    type Error = MaxLocalAucError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if p.k == 0 {
            return Err(MaxLocalAucError::Rank);
        }
        check_non_negative(p.lambda, MaxLocalAucError::Lambda)?;
        check_positive(p.eps, MaxLocalAucError::Eps)?;
        check_positive(p.sigma, MaxLocalAucError::Sigma)?;
        check_positive(p.alpha, MaxLocalAucError::Alpha)?;
        check_positive(p.t0, MaxLocalAucError::T0)?;

        for (count, name) in [
            (p.record_step, "record_step"),
            (p.num_row_samples, "num_row_samples"),
            (p.num_auc_samples, "num_auc_samples"),
            (p.max_iterations, "max_iterations"),
            (p.iterations_per_update, "iterations_per_update"),
        ] {
            if count == 0 {
                return Err(MaxLocalAucError::ZeroCount(name));
            }
        }

        if let Threshold::Quantile(u) = p.threshold {
            if !(u >= F::zero() && u <= F::one()) {
                return Err(MaxLocalAucError::TopFraction(u.to_f32().unwrap_or(f32::NAN)));
            }
        }

        if p.folds < 2 {
            return Err(MaxLocalAucError::Folds(p.folds));
        }
        if p.ks.is_empty() {
            return Err(MaxLocalAucError::EmptyGrid("ks"));
        }
        if p.ks.contains(&0) {
            return Err(MaxLocalAucError::Rank);
        }
        if p.lambdas.is_empty() {
            return Err(MaxLocalAucError::EmptyGrid("lambdas"));
        }
        for &lambda in &p.lambdas {
            check_non_negative(lambda, MaxLocalAucError::Lambda)?;
        }

        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> MaxLocalAucValidParams<F, R> {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn lambda(&self) -> F {
        self.lambda
    }

    pub fn eps(&self) -> F {
        self.eps
    }

    pub fn sigma(&self) -> F {
        self.sigma
    }

    pub fn stochastic(&self) -> bool {
        self.stochastic
    }

    pub fn rate(&self) -> LearningRate {
        self.rate
    }

    pub fn alpha(&self) -> F {
        self.alpha
    }

    pub fn t0(&self) -> F {
        self.t0
    }

    pub fn record_step(&self) -> usize {
        self.record_step
    }

    pub fn derivative(&self) -> Estimator {
        self.derivative
    }

    pub fn evaluation(&self) -> Estimator {
        self.evaluation
    }

    pub fn num_row_samples(&self) -> usize {
        self.num_row_samples
    }

    pub fn num_auc_samples(&self) -> usize {
        self.num_auc_samples
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn iterations_per_update(&self) -> usize {
        self.iterations_per_update
    }

    pub fn init(&self) -> InitialAlg {
        self.init
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn threshold(&self) -> &Threshold<F> {
        &self.threshold
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn ks(&self) -> &[usize] {
        &self.ks
    }

    pub fn lambdas(&self) -> &[F] {
        &self.lambdas
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    /// Step size of iteration `iteration`
    pub fn learning_rate(&self, iteration: usize) -> F {
        match self.rate {
            LearningRate::Constant => self.sigma,
            LearningRate::Optimal => F::one() / (self.alpha * (self.t0 + F::cast(iteration))),
        }
    }
}

impl<F: Float, R: Rng> fmt::Display for MaxLocalAucValidParams<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaxLocalAUC: k={} lambda={} eps={}", self.k, self.lambda, self.eps)?;
        match self.rate {
            LearningRate::Constant => write!(f, " rate=constant sigma={}", self.sigma)?,
            LearningRate::Optimal => {
                write!(f, " rate=optimal alpha={} t0={}", self.alpha, self.t0)?
            }
        }
        match &self.threshold {
            Threshold::Quantile(u) => write!(f, " u={}", u)?,
            Threshold::Fixed(r) => write!(f, " r=fixed({})", r.len())?,
        }
        write!(
            f,
            " stochastic={} num_row_samples={} num_auc_samples={} derivative={} evaluation={}",
            self.stochastic,
            self.num_row_samples,
            self.num_auc_samples,
            self.derivative,
            self.evaluation
        )?;
        write!(
            f,
            " max_iterations={} iterations_per_update={} record_step={} init={} loss={}",
            self.max_iterations,
            self.iterations_per_update,
            self.record_step,
            self.init,
            self.loss
        )?;
        write!(
            f,
            " folds={} ks={:?} lambdas={:?}",
            self.folds, self.ks, self.lambdas
        )
    }
}
