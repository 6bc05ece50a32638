//! `ranklearn-datasets` generates synthetic implicit-feedback data for tests, examples and
//! benchmarks of the `ranklearn` workspace.
//!
//! Two generators are provided in [`generate`]:
//!
//! * [`sparse_low_rank`](generate::sparse_low_rank) samples entries of a random low-rank matrix
//!   at random positions,
//! * [`sparse_binary_matrix`](generate::sparse_binary_matrix) marks, for every user, the items
//!   scored above a quantile of a random low-rank score matrix.
//!
//! Matrices are returned as `sprs::CsMat<f64>` in compressed row storage, factors as
//! `ndarray::Array2<f64>`.

pub mod generate;
