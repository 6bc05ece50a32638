use std::fmt;
use std::str::FromStr;

use rand::Rng;
use ranklearn::{Float, ParamGuard};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::BprError;

/// Ranking metric maximised by the model selection, evaluated at `validation_size`
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMetric {
    F1,
    Mrr,
}

impl SelectionMetric {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionMetric::F1 => "f1",
            SelectionMetric::Mrr => "mrr",
        }
    }
}

impl fmt::Display for SelectionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionMetric {
    type Err = BprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f1" => Ok(SelectionMetric::F1),
            "mrr" => Ok(SelectionMetric::Mrr),
            _ => Err(BprError::UnknownMetric(s.to_string())),
        }
    }
}

/// A verified hyper-parameter set ready for the estimation of a [BPR](crate::Bpr) model
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct BprValidParams<F: Float, R: Rng> {
    pub(crate) k: usize,
    pub(crate) lambda_user: F,
    pub(crate) lambda_pos: F,
    pub(crate) lambda_neg: F,
    pub(crate) learning_rate: F,
    pub(crate) max_iterations: usize,
    pub(crate) num_auc_samples: usize,
    pub(crate) record_step: usize,
    pub(crate) folds: usize,
    pub(crate) validation_size: usize,
    pub(crate) col_probs: Option<Vec<f64>>,
    pub(crate) metric: SelectionMetric,
    pub(crate) ks: Vec<usize>,
    pub(crate) lambda_users: Vec<F>,
    pub(crate) lambda_items: Vec<F>,
    pub(crate) learning_rates: Vec<F>,
    pub(crate) n_threads: usize,
    pub(crate) rng: R,
}

/// A helper struct used to construct a set of [valid hyperparameters](BprValidParams) for
/// [BPR](crate::Bpr) using the builder pattern
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct BprParams<F: Float, R: Rng>(pub(crate) BprValidParams<F, R>);

fn powers_of_half<F: Float>() -> Vec<F> {
    [1, 5, 9, 13, 17]
        .iter()
        .map(|&e| F::cast(0.5f64.powi(e)))
        .collect()
}

impl<F: Float, R: Rng> BprParams<F, R> {
    /// Rank-`k` model with the default parameters:
    /// * `lambda_user = lambda_pos = lambda_neg = 0.1` and learning rate `0.1`
    /// * 25 epochs, training AUC recorded every 5 epochs from 5 pairs per user
    /// * model selection with 3 folds holding out 3 items per user, scored by F1, over
    ///   `ks = 2^3..2^7` and regularisations and learning rates `2^-1, 2^-5, .., 2^-17`
    pub fn new(k: usize, rng: R) -> Self {
        Self(BprValidParams {
            k,
            lambda_user: F::cast(0.1),
            lambda_pos: F::cast(0.1),
            lambda_neg: F::cast(0.1),
            learning_rate: F::cast(0.1),
            max_iterations: 25,
            num_auc_samples: 5,
            record_step: 5,
            folds: 3,
            validation_size: 3,
            col_probs: None,
            metric: SelectionMetric::F1,
            ks: vec![8, 16, 32, 64, 128],
            lambda_users: powers_of_half(),
            lambda_items: powers_of_half(),
            learning_rates: powers_of_half(),
            n_threads: 0,
            rng,
        })
    }

    pub fn k(mut self, k: usize) -> Self {
        self.0.k = k;
        self
    }

    /// Set the penalty of the user factors
    pub fn lambda_user(mut self, lambda_user: F) -> Self {
        self.0.lambda_user = lambda_user;
        self
    }

    /// Set the penalty of the factors of positive items
    pub fn lambda_pos(mut self, lambda_pos: F) -> Self {
        self.0.lambda_pos = lambda_pos;
        self
    }

    /// Set the penalty of the factors of negative items
    pub fn lambda_neg(mut self, lambda_neg: F) -> Self {
        self.0.lambda_neg = lambda_neg;
        self
    }

    pub fn learning_rate(mut self, learning_rate: F) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }

    /// Set the number of epochs, each of which draws as many triples as there are interactions
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }

    pub fn num_auc_samples(mut self, num_auc_samples: usize) -> Self {
        self.0.num_auc_samples = num_auc_samples;
        self
    }

    pub fn record_step(mut self, record_step: usize) -> Self {
        self.0.record_step = record_step;
        self
    }

    pub fn folds(mut self, folds: usize) -> Self {
        self.0.folds = folds;
        self
    }

    /// Set the number of items held out per user by the model selection
    pub fn validation_size(mut self, validation_size: usize) -> Self {
        self.0.validation_size = validation_size;
        self
    }

    /// Weight the held-out items by column when splitting for model selection
    pub fn col_probs(mut self, col_probs: Option<Vec<f64>>) -> Self {
        self.0.col_probs = col_probs;
        self
    }

    pub fn metric(mut self, metric: SelectionMetric) -> Self {
        self.0.metric = metric;
        self
    }

    pub fn ks(mut self, ks: Vec<usize>) -> Self {
        self.0.ks = ks;
        self
    }

    pub fn lambda_users(mut self, lambda_users: Vec<F>) -> Self {
        self.0.lambda_users = lambda_users;
        self
    }

    /// Candidate item penalties, each applied to both positive and negative items
    pub fn lambda_items(mut self, lambda_items: Vec<F>) -> Self {
        self.0.lambda_items = lambda_items;
        self
    }

    pub fn learning_rates(mut self, learning_rates: Vec<F>) -> Self {
        self.0.learning_rates = learning_rates;
        self
    }

    /// Number of worker threads of the model selection, `0` uses every logical core
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.0.n_threads = n_threads;
        self
    }

    pub fn with_rng<R2: Rng>(self, rng: R2) -> BprParams<F, R2> {
        let p = self.0;
        BprParams(BprValidParams {
            k: p.k,
            lambda_user: p.lambda_user,
            lambda_pos: p.lambda_pos,
            lambda_neg: p.lambda_neg,
            learning_rate: p.learning_rate,
            max_iterations: p.max_iterations,
            num_auc_samples: p.num_auc_samples,
            record_step: p.record_step,
            folds: p.folds,
            validation_size: p.validation_size,
            col_probs: p.col_probs,
            metric: p.metric,
            ks: p.ks,
            lambda_users: p.lambda_users,
            lambda_items: p.lambda_items,
            learning_rates: p.learning_rates,
            n_threads: p.n_threads,
            rng,
        })
    }
}

fn is_non_negative<F: Float>(x: F) -> bool {
    x.is_finite() && x >= F::zero()
}

fn check_learning_rate<F: Float>(gamma: F) -> Result<(), BprError> {
    if gamma.is_finite() && gamma > F::zero() {
        Ok(())
    } else {
        Err(BprError::LearningRate(gamma.to_f32().unwrap_or(f32::NAN)))
    }
}

impl<F: Float, R: Rng> ParamGuard for BprParams<F, R> {
    type Checked = BprValidParams<F, R>;
    type Error = BprError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if p.k == 0 || p.ks.contains(&0) {
            return Err(BprError::Rank);
        }
        for (lambda, name) in [
            (p.lambda_user, "lambda_user"),
            (p.lambda_pos, "lambda_pos"),
            (p.lambda_neg, "lambda_neg"),
        ] {
            if !is_non_negative(lambda) {
                return Err(BprError::Regularisation(name));
            }
        }
        check_learning_rate(p.learning_rate)?;

        for (count, name) in [
            (p.max_iterations, "max_iterations"),
            (p.num_auc_samples, "num_auc_samples"),
            (p.record_step, "record_step"),
            (p.validation_size, "validation_size"),
        ] {
            if count == 0 {
                return Err(BprError::ZeroCount(name));
            }
        }

        if p.folds < 2 {
            return Err(BprError::Folds(p.folds));
        }
        for (len, name) in [
            (p.ks.len(), "ks"),
            (p.lambda_users.len(), "lambda_users"),
            (p.lambda_items.len(), "lambda_items"),
            (p.learning_rates.len(), "learning_rates"),
        ] {
            if len == 0 {
                return Err(BprError::EmptyGrid(name));
            }
        }
        if !p.lambda_users.iter().all(|&l| is_non_negative(l)) {
            return Err(BprError::Regularisation("lambda_users"));
        }
        if !p.lambda_items.iter().all(|&l| is_non_negative(l)) {
            return Err(BprError::Regularisation("lambda_items"));
        }
        for &gamma in &p.learning_rates {
            check_learning_rate(gamma)?;
        }

        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> BprValidParams<F, R> {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn lambda_user(&self) -> F {
        self.lambda_user
    }

    pub fn lambda_pos(&self) -> F {
        self.lambda_pos
    }

    pub fn lambda_neg(&self) -> F {
        self.lambda_neg
    }

    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn num_auc_samples(&self) -> usize {
        self.num_auc_samples
    }

    pub fn record_step(&self) -> usize {
        self.record_step
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn validation_size(&self) -> usize {
        self.validation_size
    }

    pub fn col_probs(&self) -> Option<&[f64]> {
        self.col_probs.as_deref()
    }

    pub fn metric(&self) -> SelectionMetric {
        self.metric
    }

    pub fn ks(&self) -> &[usize] {
        &self.ks
    }

    pub fn lambda_users(&self) -> &[F] {
        &self.lambda_users
    }

    pub fn lambda_items(&self) -> &[F] {
        &self.lambda_items
    }

    pub fn learning_rates(&self) -> &[F] {
        &self.learning_rates
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

impl<F: Float, R: Rng> fmt::Display for BprValidParams<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BPR: k={} lambda_user={} lambda_pos={} lambda_neg={} gamma={}",
            self.k, self.lambda_user, self.lambda_pos, self.lambda_neg, self.learning_rate
        )?;
        write!(
            f,
            " max_iterations={} num_auc_samples={} record_step={}",
            self.max_iterations, self.num_auc_samples, self.record_step
        )?;
        write!(
            f,
            " folds={} validation_size={} metric={}",
            self.folds, self.validation_size, self.metric
        )
    }
}
