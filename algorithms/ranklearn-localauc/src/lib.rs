//! # MaxLocalAUC
//!
//! `ranklearn-localauc` learns user factors `U` and item factors `V` from implicit feedback by
//! maximising the *local AUC*: the probability that an observed item of a user is scored both
//! above an unobserved item and above the user's threshold `r_i`, which confines the ranking
//! quality measure to the top of every list.
//!
//! The local AUC is replaced by a smooth pairwise surrogate ([`Loss`]) and penalised with the
//! squared Frobenius norms of the factors. The objective is minimised by gradient descent, where
//! every sweep updates all rows of `U` (or a random subset of them) and then all rows of `V`.
//! Derivatives, objective and AUC can each be computed exactly or estimated from uniformly
//! sampled pairs ([`Estimator`]), which keeps the cost of an iteration independent of the number
//! of items.
//!
//! Model selection over ranks and penalties runs cross validation folds on a worker pool, see
//! [`MaxLocalAucParams::model_select`].
//!
//! ## Example
//!
//! ```
//! use ranklearn::prelude::*;
//! use ranklearn_localauc::{Estimator, MaxLocalAuc};
//! use ranklearn_datasets::generate::sparse_binary_matrix;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let (x, _, _) = sparse_binary_matrix((30, 40), 4, 0.8, &mut rng);
//!
//! let model = MaxLocalAuc::params(5)
//!     .derivative(Estimator::Exact)
//!     .max_iterations(20)
//!     .fit(&x)
//!     .unwrap();
//!
//! // the 3 best items of every user
//! let top = model.recommend(3, None);
//! assert_eq!(top.dim(), (30, 3));
//! ```

mod algorithm;
pub mod derivative;
mod error;
mod hyperparams;
mod loss;
mod model_selection;
pub mod objective;

pub use algorithm::*;
pub use error::*;
pub use hyperparams::*;
pub use loss::Loss;
