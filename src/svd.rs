//! Truncated singular value decomposition of interaction matrices
//!
//! Two solvers are available. [`SvdSolver::Lobpcg`] uses the iterative `TruncatedSvd` of
//! `ndarray-linalg` and is only compiled with the `ndarray-linalg` feature (it needs a LAPACK
//! backend). [`SvdSolver::Dense`] densifies the matrix and runs the pure Rust SVD of
//! `linfa-linalg`, so it is always available. A solver missing from the build reports
//! [`Error::SolverUnavailable`], which callers use to fall back to the other one.

use ndarray::{Array1, Array2, Axis};
use sprs::CsMat;

use crate::error::{Error, Result};
use crate::sparse::to_dense;
use crate::Float;

#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SvdSolver {
    /// Locally optimal block preconditioned conjugate gradient, from `ndarray-linalg`
    Lobpcg,
    /// Full decomposition of the densified matrix, from `linfa-linalg`
    Dense,
}

impl SvdSolver {
    pub fn name(&self) -> &'static str {
        match self {
            SvdSolver::Lobpcg => "lobpcg",
            SvdSolver::Dense => "dense",
        }
    }
}

/// Rank-`k` decomposition `x ~ u diag(s) v^T`
///
/// Returns `(u, s, v)` with `u` of shape `(n_rows, k)`, singular values `s` in decreasing order
/// and `v` of shape `(n_cols, k)`.
pub fn truncated_svd<F: Float>(
    x: &CsMat<F>,
    k: usize,
    solver: SvdSolver,
) -> Result<(Array2<F>, Array1<F>, Array2<F>)> {
    let (m, n) = x.shape();
    if k == 0 || k > m.min(n) {
        return Err(Error::Parameters(format!(
            "rank {} is not in [1, {}] for a {}x{} matrix",
            k,
            m.min(n),
            m,
            n
        )));
    }

    let dense = to_dense(x).mapv(|v| v.to_f64().unwrap_or_default());
    let (u, s, v) = match solver {
        SvdSolver::Lobpcg => lobpcg_svd(dense, k)?,
        SvdSolver::Dense => dense_svd(dense, k)?,
    };

    Ok((u.mapv(F::cast), s.mapv(F::cast), v.mapv(F::cast)))
}

#[cfg(feature = "ndarray-linalg")]
fn lobpcg_svd(x: Array2<f64>, k: usize) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    use ndarray_linalg::{TruncatedOrder, TruncatedSvd};

    let result = TruncatedSvd::new(x, TruncatedOrder::Largest).decompose(k)?;
    let (u, s, vt) = result.values_vectors();

    Ok((u, s, vt.reversed_axes()))
}

#[cfg(not(feature = "ndarray-linalg"))]
fn lobpcg_svd(_x: Array2<f64>, _k: usize) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    Err(Error::SolverUnavailable(SvdSolver::Lobpcg.name()))
}

fn dense_svd(x: Array2<f64>, k: usize) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    use linfa_linalg::svd::SVD;

    let (u, s, vt) = x.svd(true, true)?;
    let (u, vt) = match (u, vt) {
        (Some(u), Some(vt)) => (u, vt),
        _ => return Err(Error::Linalg("singular vectors were not computed".to_string())),
    };

    // singular values are not guaranteed to be ordered
    let mut order: Vec<usize> = (0..s.len()).collect();
    order.sort_by(|&a, &b| s[b].partial_cmp(&s[a]).unwrap_or(std::cmp::Ordering::Equal));
    order.truncate(k);

    let s = order.iter().map(|&i| s[i]).collect::<Array1<f64>>();
    let u = u.select(Axis(1), &order);
    let v = vt.select(Axis(0), &order).reversed_axes();

    Ok((u, s, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::from_triplets;
    use approx::assert_abs_diff_eq;

    fn reconstruct(u: &Array2<f64>, s: &Array1<f64>, v: &Array2<f64>) -> Array2<f64> {
        (u * s).dot(&v.t())
    }

    #[test]
    fn dense_solver_recovers_rank_one_matrix() {
        let x = from_triplets(
            (3, 2),
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 2.0), (1, 1, 4.0), (2, 0, 3.0), (2, 1, 6.0)],
        )
        .unwrap();

        let (u, s, v) = truncated_svd(&x, 1, SvdSolver::Dense).unwrap();
        assert_eq!(u.dim(), (3, 1));
        assert_eq!(v.dim(), (2, 1));
        assert_abs_diff_eq!(reconstruct(&u, &s, &v), to_dense(&x), epsilon = 1e-8);
    }

    #[test]
    fn singular_values_are_decreasing() {
        let x = from_triplets((3, 3), &[(0, 0, 1.0), (1, 1, 5.0), (2, 2, 3.0)]).unwrap();

        let (_, s, _) = truncated_svd(&x, 2, SvdSolver::Dense).unwrap();
        assert_abs_diff_eq!(s, ndarray::array![5.0, 3.0], epsilon = 1e-8);
    }

    #[test]
    fn rank_is_checked() {
        let x = from_triplets((2, 3), &[(0, 0, 1.0)]).unwrap();
        assert!(matches!(
            truncated_svd(&x, 3, SvdSolver::Dense),
            Err(Error::Parameters(_))
        ));
    }

    #[cfg(not(feature = "ndarray-linalg"))]
    #[test]
    fn missing_solver_is_reported() {
        let x = from_triplets((2, 2), &[(0, 0, 1.0)]).unwrap();
        assert!(matches!(
            truncated_svd(&x, 1, SvdSolver::Lobpcg),
            Err(Error::SolverUnavailable("lobpcg"))
        ));
    }
}
