use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use ranklearn::metrics::{f1_at_k, mrr_at_k};
use ranklearn::model_selection::{task_seeds, GridScores, GridSearch};
use ranklearn::omega::OmegaIndex;
use ranklearn::sampling::shuffle_split_rows;
use ranklearn::traits::FactorModel;
use ranklearn::{Float, ParamGuard};
use sprs::CsMat;

use crate::error::Result;
use crate::hyperparams::{BprParams, BprValidParams, SelectionMetric};

/// Indices of one grid point and fold
struct Task {
    k_idx: usize,
    user_idx: usize,
    item_idx: usize,
    rate_idx: usize,
    fold: usize,
    seed: u64,
}

impl<F: Float, R: Rng + Clone + Send + Sync> BprParams<F, R> {
    /// Selects the rank, the penalties and the learning rate by cross validation
    ///
    /// Every fold holds out `validation_size` items of every user with enough interactions. For
    /// every fold and grid point a model is trained on the remaining items and scored with the
    /// selection metric at `validation_size`, ranking only items outside the training split.
    ///
    /// On success the params are set to the best grid point, with the same item penalty for
    /// positive and negative items. The returned grids have shape
    /// `(ks.len(), lambda_users.len(), lambda_items.len(), learning_rates.len())`.
    pub fn model_select(&mut self, x: &CsMat<F>) -> Result<GridScores<F>> {
        let params = self.check_ref()?;
        let ks = params.ks.clone();
        let lambda_users = params.lambda_users.clone();
        let lambda_items = params.lambda_items.clone();
        let rates = params.learning_rates.clone();
        let (folds, n_threads) = (params.folds, params.n_threads);
        let validation_size = params.validation_size;
        let col_probs = params.col_probs.clone();
        debug!(
            "selecting BPR among ks={:?} lambda_users={:?} lambda_items={:?} learning_rates={:?}, \
             holding out {} items per user",
            ks, lambda_users, lambda_items, rates, validation_size
        );

        let splits = shuffle_split_rows(
            x,
            folds,
            validation_size,
            col_probs.as_deref(),
            &mut self.0.rng,
        )?;

        let shape = [ks.len(), lambda_users.len(), lambda_items.len(), rates.len()];
        let n_tasks = shape.iter().product::<usize>() * folds;
        let seeds = task_seeds(&mut self.0.rng, n_tasks);
        let mut tasks = Vec::with_capacity(n_tasks);
        for k_idx in 0..shape[0] {
            for user_idx in 0..shape[1] {
                for item_idx in 0..shape[2] {
                    for rate_idx in 0..shape[3] {
                        for fold in 0..folds {
                            tasks.push(Task {
                                k_idx,
                                user_idx,
                                item_idx,
                                rate_idx,
                                fold,
                                seed: seeds[tasks.len()],
                            });
                        }
                    }
                }
            }
        }

        let base = &self.0;
        let scores = GridSearch::new(n_threads).run(tasks, |task| {
            let mut params = base.clone();
            params.k = ks[task.k_idx];
            params.lambda_user = lambda_users[task.user_idx];
            params.lambda_pos = lambda_items[task.item_idx];
            params.lambda_neg = lambda_items[task.item_idx];
            params.learning_rate = rates[task.rate_idx];

            let (train, test) = &splits[task.fold];
            let mut rng = Xoshiro256Plus::seed_from_u64(task.seed);
            score(&params, train, test, &mut rng)
        })?;

        let grid = GridScores::from_fold_scores(&shape, folds, &scores)?;
        let best = &grid.best;
        self.0.k = ks[best[0]];
        self.0.lambda_user = lambda_users[best[1]];
        self.0.lambda_pos = lambda_items[best[2]];
        self.0.lambda_neg = lambda_items[best[2]];
        self.0.learning_rate = rates[best[3]];
        debug!(
            "selected k={} lambda_user={} lambda_item={} gamma={} with {} {}",
            self.0.k,
            self.0.lambda_user,
            self.0.lambda_pos,
            self.0.learning_rate,
            self.0.metric,
            grid.best_score()
        );

        Ok(grid)
    }
}

/// Held-out F1 or MRR at `validation_size` of a model trained on `train`
fn score<F: Float, R: Rng>(
    params: &BprValidParams<F, R>,
    train: &CsMat<F>,
    test: &CsMat<F>,
    rng: &mut Xoshiro256Plus,
) -> Result<F> {
    if test.nnz() == 0 {
        warn!("empty validation split for {}, skipping", params);
        return Ok(F::nan());
    }

    let model = params.fit_with_rng(train, rng)?;
    let seen = OmegaIndex::from_matrix(train)?;
    let k = params.validation_size.min(train.cols());
    let ranked = model.recommend(k, Some(&seen));

    let metric = match params.metric {
        SelectionMetric::F1 => f1_at_k(test, ranked.view(), k)?,
        SelectionMetric::Mrr => mrr_at_k(test, ranked.view(), k)?,
    };
    Ok(metric)
}
