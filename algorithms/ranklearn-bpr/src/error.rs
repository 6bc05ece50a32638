//! Error definitions for BPR
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BprError>;

#[derive(Error, Debug, Clone)]
pub enum BprError {
    #[error("rank k cannot be 0")]
    Rank,
    #[error("regularisation {0} should be non-negative and finite")]
    Regularisation(&'static str),
    #[error("learning rate gamma should be positive and finite, but is {0}")]
    LearningRate(f32),
    #[error("{0} cannot be 0")]
    ZeroCount(&'static str),
    #[error("cross validation needs at least 2 folds, but got {0}")]
    Folds(usize),
    #[error("candidate list {0} is empty")]
    EmptyGrid(&'static str),
    #[error("unknown selection metric {0:?}, expected f1 or mrr")]
    UnknownMetric(String),
    #[error(transparent)]
    RanklearnError(#[from] ranklearn::error::Error),
}
