//! Error definitions for MaxLocalAUC
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MaxLocalAucError>;

/// An error when fitting or selecting a MaxLocalAUC model
#[derive(Error, Debug, Clone)]
pub enum MaxLocalAucError {
    #[error("rank k cannot be 0")]
    Rank,
    #[error("rank {k} is larger than min(n_users, n_items) = {max}, which SVD initialisation needs")]
    SvdRank { k: usize, max: usize },
    #[error("learning rate sigma should be positive and finite, but is {0}")]
    Sigma(f32),
    #[error("regularisation lambda should be non-negative and finite, but is {0}")]
    Lambda(f32),
    #[error("convergence tolerance eps should be positive, but is {0}")]
    Eps(f32),
    #[error("alpha should be positive and finite, but is {0}")]
    Alpha(f32),
    #[error("t0 should be positive and finite, but is {0}")]
    T0(f32),
    #[error("top fraction u should be in range [0, 1], but is {0}")]
    TopFraction(f32),
    #[error("{0} cannot be 0")]
    ZeroCount(&'static str),
    #[error("cross validation needs at least 2 folds, but got {0}")]
    Folds(usize),
    #[error("candidate list {0} is empty")]
    EmptyGrid(&'static str),
    #[error("fixed threshold has {found} entries, but the interaction matrix has {expected} users")]
    ThresholdLength { expected: usize, found: usize },
    #[error("unknown initialisation {0:?}, expected one of rand, ones, svd")]
    UnknownInit(String),
    #[error("unknown learning rate schedule {0:?}, expected constant or optimal")]
    UnknownRate(String),
    #[error("unknown loss {0:?}, expected one of sigmoid, hinge, squared_hinge, square, logistic")]
    UnknownLoss(String),
    #[error("unknown estimator {0:?}, expected exact or sampled")]
    UnknownEstimator(String),
    #[error(transparent)]
    RanklearnError(#[from] ranklearn::error::Error),
}
