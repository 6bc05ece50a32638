//! Grid search over hyperparameters
//!
//! The learners select hyperparameters by scoring every point of a grid on every fold of a
//! cross-validation split. Each `(grid point, fold)` pair is an independent task, so tasks run on
//! a `rayon` worker pool. Results are always collected in task order, and every task receives its
//! own seed drawn up front from the caller's generator, so a search with a given seed returns the
//! same scores whatever the number of threads.

use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::{Error, Result};
use crate::Float;

/// Runs independent tasks on a dedicated worker pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSearch {
    n_threads: usize,
}

impl Default for GridSearch {
    fn default() -> Self {
        GridSearch { n_threads: 0 }
    }
}

impl GridSearch {
    /// Pool with `n_threads` workers, `0` lets `rayon` pick the number of logical cores
    pub fn new(n_threads: usize) -> Self {
        GridSearch { n_threads }
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Evaluates `eval` on every task and returns the results in the order of `tasks`
    ///
    /// The first error returned by a task aborts the search.
    pub fn run<T, S, E, G>(&self, tasks: Vec<T>, eval: G) -> std::result::Result<Vec<S>, E>
    where
        T: Send,
        S: Send,
        E: Send + From<Error>,
        G: Fn(T) -> std::result::Result<S, E> + Sync + Send,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.n_threads)
            .build()
            .map_err(Error::from)?;

        debug!(
            "running {} grid search tasks on {} threads",
            tasks.len(),
            pool.current_num_threads()
        );

        pool.install(|| tasks.into_par_iter().map(|task| eval(task)).collect())
    }
}

/// One seed per task, drawn in task order
pub fn task_seeds<R: Rng>(rng: &mut R, n_tasks: usize) -> Vec<u64> {
    (0..n_tasks).map(|_| rng.gen()).collect()
}

/// Mean and standard deviation over folds of a grid of scores
#[derive(Clone, Debug, PartialEq)]
pub struct GridScores<F> {
    /// Mean score of every grid point, shape of the grid
    pub mean: ArrayD<F>,
    /// Standard deviation of the scores over folds
    pub std: ArrayD<F>,
    /// Multi-index of the best grid point
    pub best: Vec<usize>,
}

impl<F: Float> GridScores<F> {
    /// Aggregates `scores`, laid out grid point by grid point in row-major order with the folds
    /// of a grid point stored contiguously
    ///
    /// NaN scores (from empty test splits) are ignored. A grid point without any finite score
    /// gets NaN as mean and standard deviation. The best grid point is the first strict maximum
    /// of the means in row-major order.
    pub fn from_fold_scores(grid_shape: &[usize], folds: usize, scores: &[F]) -> Result<Self> {
        let n_points: usize = grid_shape.iter().product();
        if folds == 0 || n_points == 0 {
            return Err(Error::Parameters("empty hyperparameter grid".to_string()));
        }
        if scores.len() != n_points * folds {
            return Err(Error::Parameters(format!(
                "{} scores for {} grid points and {} folds",
                scores.len(),
                n_points,
                folds
            )));
        }

        let (means, stds): (Vec<F>, Vec<F>) = scores
            .chunks(folds)
            .map(|point| {
                let finite: Vec<F> = point.iter().copied().filter(|s| !s.is_nan()).collect();
                if finite.is_empty() {
                    return (F::nan(), F::nan());
                }
                let n = F::cast(finite.len());
                let mean = finite.iter().copied().sum::<F>() / n;
                let var = finite.iter().map(|&s| (s - mean) * (s - mean)).sum::<F>() / n;
                (mean, var.sqrt())
            })
            .unzip();

        let mut best = 0;
        for (i, &m) in means.iter().enumerate() {
            if !m.is_nan() && (means[best].is_nan() || m > means[best]) {
                best = i;
            }
        }
        if means[best].is_nan() {
            warn!("no grid point has a finite score, selecting the first one");
        }

        let shape = IxDyn(grid_shape);
        let mean = ArrayD::from_shape_vec(shape.clone(), means)?;
        let std = ArrayD::from_shape_vec(shape, stds)?;

        Ok(GridScores {
            best: unravel(best, grid_shape),
            mean,
            std,
        })
    }

    /// Mean score of the best grid point
    pub fn best_score(&self) -> F {
        self.mean[IxDyn(&self.best)]
    }
}

fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (axis, &len) in shape.iter().enumerate().rev() {
        index[axis] = flat % len;
        flat /= len;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn results_keep_task_order() {
        let search = GridSearch::new(4);
        let out: Vec<usize> = search
            .run::<_, _, Error, _>((0..100).collect(), |t| Ok(t * 2))
            .unwrap();
        assert_eq!(out, (0..100).map(|t| t * 2).collect::<Vec<_>>());
    }

    #[test]
    fn task_error_aborts() {
        let search = GridSearch::new(2);
        let out = search.run((0..10).collect(), |t: usize| {
            if t == 7 {
                Err(Error::Parameters("seven".to_string()))
            } else {
                Ok(t)
            }
        });
        assert!(matches!(out, Err(Error::Parameters(_))));
    }

    #[test]
    fn seeds_are_reproducible() {
        let a = task_seeds(&mut Xoshiro256Plus::seed_from_u64(3), 8);
        let b = task_seeds(&mut Xoshiro256Plus::seed_from_u64(3), 8);
        assert_eq!(a, b);
    }

    #[test]
    fn mean_and_std_over_folds() {
        let scores = [0.1, 0.3, 0.5, 0.5, 0.2, 0.4];
        let grid = GridScores::from_fold_scores(&[3], 2, &scores).unwrap();

        assert_abs_diff_eq!(grid.mean[[0]], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.std[[0]], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.std[[1]], 0.0);
        assert_eq!(grid.best, vec![1]);
        assert_abs_diff_eq!(grid.best_score(), 0.5);
    }

    #[test]
    fn ties_select_first_point() {
        let scores = [0.5, 0.2, 0.5, 0.5];
        let grid = GridScores::from_fold_scores(&[2, 2], 1, &scores).unwrap();
        assert_eq!(grid.best, vec![0, 0]);
        assert_eq!(grid.mean.shape(), &[2, 2]);
    }

    #[test]
    fn nan_scores_are_ignored() {
        let scores = [f64::NAN, f64::NAN, 0.4, f64::NAN, 0.3, 0.5];
        let grid = GridScores::from_fold_scores(&[3], 2, &scores).unwrap();

        assert!(grid.mean[[0]].is_nan());
        assert_abs_diff_eq!(grid.mean[[1]], 0.4);
        assert_eq!(grid.best, vec![1]);
    }

    #[test]
    fn multi_index_is_row_major() {
        assert_eq!(unravel(5, &[2, 3]), vec![1, 2]);
        assert_eq!(unravel(7, &[2, 2, 2]), vec![1, 1, 1]);
    }

    #[test]
    fn score_count_is_checked() {
        assert!(GridScores::from_fold_scores(&[2], 3, &[0.0f64; 5]).is_err());
    }
}
