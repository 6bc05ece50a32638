use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use ranklearn::metrics::{local_auc_exact, local_auc_sampled};
use ranklearn::model_selection::{task_seeds, GridScores, GridSearch};
use ranklearn::omega::OmegaIndex;
use ranklearn::sampling::rand_cross_validation;
use ranklearn::sparse::submatrix;
use ranklearn::traits::FactorModel;
use ranklearn::{Float, ParamGuard};
use sprs::CsMat;

use crate::error::Result;
use crate::hyperparams::{Estimator, MaxLocalAucParams, MaxLocalAucValidParams};

/// One `(rank, penalty, fold)` cell of the grid
struct Task {
    k: usize,
    lambda_idx: usize,
    fold: usize,
    seed: u64,
}

impl<F: Float, R: Rng + Clone + Send + Sync> MaxLocalAucParams<F, R> {
    /// Selects the rank and the penalty by cross validation
    ///
    /// The stored entries of `x` are split into `folds` random blocks. For every fold, every rank
    /// of `ks` and every penalty of `lambdas`, a model is trained on the other blocks and scored
    /// with the local AUC of the held-out block, using the evaluation estimator. Tasks run on
    /// `n_threads` workers.
    ///
    /// On success the rank and penalty of these params are set to the best grid point and the
    /// mean and standard deviation of the scores are returned, with shape
    /// `(ks.len(), lambdas.len())`.
    pub fn model_select(&mut self, x: &CsMat<F>) -> Result<GridScores<F>> {
        let params = self.check_ref()?;
        let (ks, lambdas, folds) = (params.ks.clone(), params.lambdas.clone(), params.folds);
        let n_threads = params.n_threads;
        debug!(
            "selecting among ranks {:?} and penalties {:?} with {} folds",
            ks, lambdas, folds
        );

        let splits = rand_cross_validation(folds, x.nnz(), &mut self.0.rng)?
            .into_iter()
            .map(|(train, test)| -> Result<_> {
                Ok((submatrix(x, &train)?, submatrix(x, &test)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let n_tasks = ks.len() * lambdas.len() * folds;
        let seeds = task_seeds(&mut self.0.rng, n_tasks);
        let mut tasks = Vec::with_capacity(n_tasks);
        for &k in &ks {
            for lambda_idx in 0..lambdas.len() {
                for fold in 0..folds {
                    tasks.push(Task {
                        k,
                        lambda_idx,
                        fold,
                        seed: seeds[tasks.len()],
                    });
                }
            }
        }

        let base = &self.0;
        let scores = GridSearch::new(n_threads).run(tasks, |task| {
            let (train, test) = &splits[task.fold];
            let mut rng = Xoshiro256Plus::seed_from_u64(task.seed);
            let lambda = lambdas[task.lambda_idx];
            score(base, task.k, lambda, train, test, &mut rng)
        })?;

        let grid = GridScores::from_fold_scores(&[ks.len(), lambdas.len()], folds, &scores)?;
        self.0.k = ks[grid.best[0]];
        self.0.lambda = lambdas[grid.best[1]];
        debug!(
            "selected k={} lambda={} with local AUC {}",
            self.0.k,
            self.0.lambda,
            grid.best_score()
        );

        Ok(grid)
    }
}

/// Held-out local AUC of a model trained with rank `k` and penalty `lambda`
fn score<F: Float, R: Rng + Clone>(
    base: &MaxLocalAucValidParams<F, R>,
    k: usize,
    lambda: F,
    train: &CsMat<F>,
    test: &CsMat<F>,
    rng: &mut Xoshiro256Plus,
) -> Result<F> {
    if test.nnz() == 0 {
        warn!("empty test split for k={} lambda={}, skipping", k, lambda);
        return Ok(F::nan());
    }

    let mut params = base.clone();
    params.k = k;
    params.lambda = lambda;
    let model = params.fit_with_rng(train, rng)?;

    let omega = OmegaIndex::from_matrix(test)?;
    let (u, v) = (model.user_factors(), model.item_factors());
    let r = model.threshold().view();
    let auc = match base.evaluation() {
        Estimator::Exact => local_auc_exact(&omega, u, v, r)?,
        Estimator::Sampled => {
            local_auc_sampled(&omega, u, v, r, base.num_auc_samples(), rng)?
        }
    };

    Ok(auc)
}
