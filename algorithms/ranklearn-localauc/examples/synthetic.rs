use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use ranklearn::metrics::{f1_at_k, local_auc};
use ranklearn::omega::OmegaIndex;
use ranklearn::prelude::*;
use ranklearn::sampling::shuffle_split_rows;
use ranklearn_datasets::generate::sparse_binary_matrix;
use ranklearn_localauc::MaxLocalAuc;

// Select the rank and the penalty of a MaxLocalAUC model on synthetic data, then train the
// selected model and score it on held-out interactions.
fn main() {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);

    // 200 users, 300 items, each user observes the 10% of items with the highest rank-8 score
    let (x, _, _) = sparse_binary_matrix((200, 300), 8, 0.9, &mut rng);

    // hold out 5 items per user for the final evaluation
    let (train, test) = shuffle_split_rows(&x, 1, 5, None, &mut rng)
        .expect("valid split")
        .remove(0);

    let mut params = MaxLocalAuc::params_with_rng(8, rng)
        .ks(vec![4, 8, 16])
        .lambdas(vec![1e-5, 1e-3])
        .max_iterations(30);

    let grid = params.model_select(&train).expect("model selection");
    println!("mean local AUC over folds:\n{}", grid.mean);

    let model = params.fit(&train).expect("MaxLocalAUC fitted");
    println!(
        "trained for {} iterations in {:?} ({:?})",
        model.n_iterations(),
        model.elapsed(),
        model.termination()
    );

    let seen = OmegaIndex::from_matrix(&train).expect("non-empty matrix");
    let ranked = model.recommend(5, Some(&seen));
    let f1 = f1_at_k(&test, ranked.view(), 5).expect("valid ranking");
    let auc = local_auc(&test, model.user_factors(), model.item_factors(), 0.1)
        .expect("valid factors");

    println!("test F1@5 = {:.4}, local AUC@0.1 = {:.4}", f1, auc);
}
