//! Train/test splits for model selection
//!
//! Two schemes are provided. [`rand_cross_validation`] partitions indices (typically the stored
//! entries of an interaction matrix) into `folds` random blocks, while [`shuffle_split_rows`]
//! holds out a fixed number of items of every user.

use rand::seq::SliceRandom;
use rand::Rng;
use sprs::CsMat;

use crate::error::{Error, Result};
use crate::omega::OmegaIndex;
use crate::sparse::from_triplets;
use crate::Float;

/// Random k-fold partition of `0..n`
///
/// Returns one `(train, test)` pair of index lists per fold. The test blocks are disjoint and
/// cover `0..n`, and every train block is the complement of its test block. Block sizes differ by
/// at most one; when `n < folds` some test blocks are empty.
pub fn rand_cross_validation<R: Rng>(
    folds: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if folds < 2 {
        return Err(Error::Parameters(format!(
            "cross validation needs at least 2 folds, got {}",
            folds
        )));
    }

    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);

    let splits = (0..folds)
        .map(|fold| {
            let start = fold * n / folds;
            let end = (fold + 1) * n / folds;
            let test = perm[start..end].to_vec();
            let train = perm[..start]
                .iter()
                .chain(perm[end..].iter())
                .copied()
                .collect();
            (train, test)
        })
        .collect();

    Ok(splits)
}

/// Per-row hold-out splits
///
/// For every fold and every row, `test_size` of the stored items are moved to the test matrix,
/// provided at least one item remains for training; rows with too few items keep them all in
/// training. With `col_probs`, held-out items are drawn without replacement with probability
/// proportional to the weight of their column, otherwise uniformly.
pub fn shuffle_split_rows<F: Float, R: Rng>(
    x: &CsMat<F>,
    folds: usize,
    test_size: usize,
    col_probs: Option<&[f64]>,
    rng: &mut R,
) -> Result<Vec<(CsMat<F>, CsMat<F>)>> {
    if folds == 0 {
        return Err(Error::Parameters("number of folds cannot be 0".to_string()));
    }
    if let Some(probs) = col_probs {
        if probs.len() != x.cols() {
            return Err(Error::Parameters(format!(
                "{} column weights given for {} columns",
                probs.len(),
                x.cols()
            )));
        }
    }

    let omega = OmegaIndex::from_matrix(x)?;
    let mut splits = Vec::with_capacity(folds);

    for _ in 0..folds {
        let mut train = Vec::new();
        let mut test = Vec::new();

        for (i, row) in omega.rows().enumerate() {
            let n_test = test_size.min(row.len().saturating_sub(1));
            let held_out: Vec<usize> = match col_probs {
                Some(probs) if n_test > 0 => row
                    .choose_multiple_weighted(rng, n_test, |&j| probs[j].max(1e-12))
                    .map_err(|err| Error::Parameters(err.to_string()))?
                    .copied()
                    .collect(),
                _ => row.choose_multiple(rng, n_test).copied().collect(),
            };

            for &j in row {
                let entry = (i, j, entry_value(x, i, j));
                if held_out.contains(&j) {
                    test.push(entry);
                } else {
                    train.push(entry);
                }
            }
        }

        splits.push((from_triplets(x.shape(), &train)?, from_triplets(x.shape(), &test)?));
    }

    Ok(splits)
}

fn entry_value<F: Float>(x: &CsMat<F>, i: usize, j: usize) -> F {
    x.get(i, j).copied().unwrap_or_else(F::one)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::to_dense;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;
    use std::collections::BTreeSet;

    #[test]
    fn folds_partition_indices() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let splits = rand_cross_validation(3, 20, &mut rng).unwrap();

        assert_eq!(splits.len(), 3);
        let mut all_test = BTreeSet::new();
        for (train, test) in &splits {
            assert_eq!(train.len() + test.len(), 20);
            let train: BTreeSet<_> = train.iter().collect();
            assert!(test.iter().all(|i| !train.contains(i)));
            for &i in test {
                assert!(all_test.insert(i));
            }
        }
        assert_eq!(all_test.len(), 20);
    }

    #[test]
    fn more_folds_than_entries_leaves_empty_tests() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let splits = rand_cross_validation(4, 2, &mut rng).unwrap();
        assert!(splits.iter().any(|(_, test)| test.is_empty()));
        assert!(rand_cross_validation(1, 2, &mut rng).is_err());
    }

    #[test]
    fn rows_keep_a_training_item() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let x = from_triplets(
            (3, 6),
            &[
                (0, 0, 1.0),
                (0, 1, 1.0),
                (0, 2, 1.0),
                (0, 5, 1.0),
                (1, 3, 1.0),
                (2, 1, 1.0),
                (2, 4, 1.0),
            ],
        )
        .unwrap();

        for (train, test) in shuffle_split_rows(&x, 2, 2, None, &mut rng).unwrap() {
            let train_omega = OmegaIndex::from_matrix(&train).unwrap();
            let test_omega = OmegaIndex::from_matrix(&test).unwrap();

            assert_eq!(test_omega.row(0).len(), 2);
            assert!(test_omega.row(1).is_empty());
            assert_eq!(test_omega.row(2).len(), 1);
            for i in 0..3 {
                assert!(!train_omega.row(i).is_empty());
            }
            assert_abs_diff_eq!(to_dense(&train) + to_dense(&test), to_dense(&x));
        }
    }

    #[test]
    fn weighted_hold_out_prefers_heavy_columns() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let x = from_triplets((1, 3), &[(0, 0, 1.0), (0, 1, 1.0), (0, 2, 1.0)]).unwrap();
        let probs = [0.0, 0.0, 1.0];

        for (_, test) in shuffle_split_rows(&x, 5, 1, Some(&probs), &mut rng).unwrap() {
            let test_omega = OmegaIndex::from_matrix(&test).unwrap();
            assert_eq!(test_omega.row(0), &[2]);
        }
    }
}
