//! `ranklearn` learns low-rank user and item embeddings from sparse implicit feedback, so that
//! the items of every user can be ranked by predicted preference.
//!
//! The root crate holds everything the learners share:
//!
//! * the [`Float`] bound and the [`ParamGuard`] hyperparameter checking pattern,
//! * the [`OmegaIndex`](omega::OmegaIndex), a per-user list of observed items,
//! * sparse matrix helpers and cross-validation splits,
//! * a truncated SVD with two interchangeable solvers, used for warm starts,
//! * ranking metrics (precision, recall, F1, MRR, AUC and the thresholded *local* AUC),
//! * a grid search which runs (hyperparameter, fold) tasks on a worker pool.
//!
//! The learners themselves live in the algorithm crates of the workspace:
//! `ranklearn-localauc` maximises a smooth surrogate of the local AUC and `ranklearn-bpr`
//! implements Bayesian Personalized Ranking.
//!
//! ## Example
//!
//! ```
//! use ndarray::array;
//! use ranklearn::metrics;
//! use ranklearn::sparse::from_triplets;
//!
//! let x = from_triplets((2, 3), &[(0, 0, 1.0), (1, 2, 1.0)]).unwrap();
//! let u = array![[1.0, 0.0], [0.0, 1.0]];
//! let v = array![[1.0, 0.0], [0.0, 0.0], [0.0, 1.0]];
//!
//! // every observed item is ranked above every unobserved one
//! let auc: f64 = metrics::auc(&x, u.view(), v.view()).unwrap();
//! assert_eq!(auc, 1.0);
//! ```

pub mod benchmarks;
pub mod error;
mod float;
mod metrics_ranking;
mod metrics_regression;
pub mod model_selection;
pub mod omega;
mod param_guard;
pub mod prelude;
pub mod sampling;
pub mod sparse;
pub mod svd;
pub mod traits;

pub use error::{Error, Result};
pub use float::Float;
pub use param_guard::ParamGuard;

#[cfg(feature = "ndarray-linalg")]
pub use ndarray_linalg as linalg;

/// Common metrics for ranking and rating prediction
pub mod metrics {
    pub use crate::metrics_ranking::{
        auc, compute_r, f1_at_k, local_auc, local_auc_approx, local_auc_exact, local_auc_sampled,
        mrr_at_k, precision_at_k, recall_at_k, recommend_at_k,
    };
    pub use crate::metrics_regression::mean_sq_error;
}
