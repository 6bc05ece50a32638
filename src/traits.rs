//! Provide traits for the learners of the workspace
//!

use ndarray::{Array1, Array2, ArrayView2};
use sprs::CsMat;

use crate::omega::OmegaIndex;
use crate::{metrics, Float};

/// Fittable algorithms
///
/// A fittable algorithm takes an interaction matrix with shape `(n_users, n_items)` and creates a
/// factor model. Hyperparameters are validated before fitting, so `fit` only fails on invalid
/// data or on errors reported by a numerical routine.
pub trait Fit<F: Float, E: std::error::Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, interactions: &CsMat<F>) -> Result<Self::Object, E>;
}

/// A fitted low-rank model: user `i` prefers item `p` to item `q` when
/// `u_i . v_p > u_i . v_q`.
pub trait FactorModel<F: Float> {
    /// User factors with shape `(n_users, k)`
    fn user_factors(&self) -> ArrayView2<'_, F>;

    /// Item factors with shape `(n_items, k)`
    fn item_factors(&self) -> ArrayView2<'_, F>;

    /// Predicted scores for every (user, item) pair, shape `(n_users, n_items)`
    fn scores(&self) -> Array2<F> {
        self.user_factors().dot(&self.item_factors().t())
    }

    /// Predicted scores of a single user
    fn user_scores(&self, user: usize) -> Array1<F> {
        self.item_factors().dot(&self.user_factors().row(user))
    }

    /// Indices of the `k` best scored items of every user, best first. Items stored in `exclude`
    /// (typically the training interactions) are ranked after every other item.
    fn recommend(&self, k: usize, exclude: Option<&OmegaIndex>) -> Array2<usize> {
        metrics::recommend_at_k(self.user_factors(), self.item_factors(), k, exclude)
    }
}
