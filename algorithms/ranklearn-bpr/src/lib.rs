//! # Bayesian Personalized Ranking
//!
//! `ranklearn-bpr` fits user factors `U` and item factors `V` to implicit feedback by stochastic
//! gradient ascent on the BPR criterion: for a user `u`, an observed item `i` and an unobserved
//! item `j` drawn uniformly, the log-likelihood `ln sigma(u . v_i - u . v_j)` is increased, with
//! separate L2 penalties for users, positive items and negative items.
//!
//! It serves as the pairwise baseline of the workspace. Hyperparameters are chosen by
//! [`BprParams::model_select`], which holds out a few items of every user and maximises the F1
//! score or the mean reciprocal rank of the recommendations.
//!
//! ## Example
//!
//! ```
//! use ranklearn::prelude::*;
//! use ranklearn_bpr::Bpr;
//! use ranklearn_datasets::generate::sparse_binary_matrix;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let (x, _, _) = sparse_binary_matrix((30, 40), 4, 0.8, &mut rng);
//!
//! let model = Bpr::params(8).learning_rate(0.05).fit(&x).unwrap();
//! assert_eq!(model.item_factors().dim(), (40, 8));
//! assert_eq!(model.local_aucs().len(), 5);
//! ```

mod algorithm;
mod error;
mod hyperparams;
mod model_selection;

pub use algorithm::*;
pub use error::*;
pub use hyperparams::*;
