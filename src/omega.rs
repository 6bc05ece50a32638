//! Adjacency index of an interaction matrix
//!
//! For every user `i` the index stores `omega_i`, the sorted column indices of the nonzero
//! entries of row `i`. Its complement within `[0, n_items)`, `omega_bar_i`, is never stored: it is
//! either materialised on demand with [`OmegaIndex::complement`] or addressed element-wise with
//! [`OmegaIndex::nth_complement`], which is what the sampling estimators use.

use sprs::CsMat;

use crate::error::{Error, Result};
use crate::Float;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OmegaIndex {
    indptr: Vec<usize>,
    indices: Vec<usize>,
    ncols: usize,
}

impl OmegaIndex {
    /// Builds the index of the nonzero entries of `x`
    ///
    /// Works for both storage orders. Explicitly stored zeros are skipped and duplicated entries
    /// are collapsed. Fails if `x` has no rows or no columns.
    pub fn from_matrix<F: Float>(x: &CsMat<F>) -> Result<Self> {
        let (nrows, ncols) = x.shape();
        if nrows == 0 || ncols == 0 {
            return Err(Error::EmptyMatrix((nrows, ncols)));
        }

        let mut rows = vec![Vec::new(); nrows];
        for (val, (i, j)) in x.iter() {
            if *val != F::zero() {
                rows[i].push(j);
            }
        }

        Ok(Self::from_rows(rows, ncols))
    }

    /// Builds the index from explicit lists of column indices, one list per row
    ///
    /// # Panics
    ///
    /// If a column index is not smaller than `ncols`.
    pub fn from_rows(rows: Vec<Vec<usize>>, ncols: usize) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        indptr.push(0);

        for mut row in rows {
            row.sort_unstable();
            row.dedup();
            assert!(
                row.last().map_or(true, |&j| j < ncols),
                "column index out of bounds"
            );
            indices.extend(row);
            indptr.push(indices.len());
        }

        OmegaIndex {
            indptr,
            indices,
            ncols,
        }
    }

    /// Number of rows (users)
    pub fn nrows(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Number of columns (items)
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Total number of observed entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Sorted observed columns of row `i`
    pub fn row(&self, i: usize) -> &[usize] {
        &self.indices[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Size of `omega_bar_i`
    pub fn complement_len(&self, i: usize) -> usize {
        self.ncols - self.row(i).len()
    }

    /// True when row `i` has at least one observed and one unobserved column, i.e. when at least
    /// one (positive, negative) pair exists
    pub fn has_pairs(&self, i: usize) -> bool {
        let len = self.row(i).len();
        len != 0 && len != self.ncols
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.row(i).binary_search(&j).is_ok()
    }

    /// Sorted unobserved columns of row `i`
    pub fn complement(&self, i: usize) -> Vec<usize> {
        let row = self.row(i);
        let mut out = Vec::with_capacity(self.ncols - row.len());
        let mut observed = row.iter().peekable();

        for j in 0..self.ncols {
            if observed.peek() == Some(&&j) {
                observed.next();
            } else {
                out.push(j);
            }
        }

        out
    }

    /// The `t`-th smallest unobserved column of row `i`
    ///
    /// The number of unobserved columns below `row[l]` is `row[l] - l`, which is non-decreasing
    /// in `l`, so the answer is found with a binary search over the observed columns.
    ///
    /// # Panics
    ///
    /// If `t >= self.complement_len(i)`.
    pub fn nth_complement(&self, i: usize, t: usize) -> usize {
        assert!(t < self.complement_len(i), "complement index out of bounds");
        let row = self.row(i);

        let (mut lo, mut hi) = (0, row.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if row[mid] - mid <= t {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        t + lo
    }

    /// Restricts every row to the columns of `cols`
    ///
    /// The result keeps the column count, so complements are still taken in `[0, ncols)`. The
    /// removed indices of row `i` are exactly `omega_i \ cols`. Entries of `cols` outside
    /// `[0, ncols)` match no stored item and are ignored.
    pub fn restrict(&self, cols: &[usize]) -> OmegaIndex {
        let mut keep = vec![false; self.ncols];
        for &j in cols.iter().filter(|&&j| j < self.ncols) {
            keep[j] = true;
        }

        let mut indptr = Vec::with_capacity(self.indptr.len());
        let mut indices = Vec::new();
        indptr.push(0);
        for i in 0..self.nrows() {
            indices.extend(self.row(i).iter().filter(|&&j| keep[j]));
            indptr.push(indices.len());
        }

        OmegaIndex {
            indptr,
            indices,
            ncols: self.ncols,
        }
    }

    /// Item-major view of the same entries: row `j` of the result lists the users of item `j`
    pub fn transpose(&self) -> OmegaIndex {
        let mut rows = vec![Vec::new(); self.ncols];
        for i in 0..self.nrows() {
            for &j in self.row(i) {
                rows[j].push(i);
            }
        }

        OmegaIndex::from_rows(rows, self.nrows())
    }

    /// Iterates over the rows of the index
    pub fn rows(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.nrows()).map(move |i| self.row(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::from_triplets;
    use rand::seq::index::sample;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;
    use ranklearn_datasets::generate::sparse_binary_matrix;
    use std::collections::BTreeSet;

    fn assert_partition(omega: &OmegaIndex) {
        for i in 0..omega.nrows() {
            let observed: BTreeSet<_> = omega.row(i).iter().copied().collect();
            let unobserved: BTreeSet<_> = omega.complement(i).into_iter().collect();

            assert!(observed.is_disjoint(&unobserved));
            assert_eq!(observed.len() + unobserved.len(), omega.ncols());
            assert_eq!(unobserved.len(), omega.complement_len(i));
        }
    }

    #[test]
    fn rows_are_sorted_and_skip_zeros() {
        let x = from_triplets(
            (3, 4),
            &[(0, 3, 1.0), (0, 1, 2.0), (1, 2, 0.0), (2, 0, 1.0), (2, 3, 1.0)],
        )
        .unwrap();
        let omega = OmegaIndex::from_matrix(&x).unwrap();

        assert_eq!(omega.row(0), &[1, 3]);
        assert!(omega.row(1).is_empty());
        assert_eq!(omega.row(2), &[0, 3]);
        assert_eq!(omega.nnz(), 4);
        assert_eq!(omega.complement(0), vec![0, 2]);
        assert!(omega.contains(2, 3));
        assert!(!omega.contains(1, 2));
        assert!(!omega.has_pairs(1));
    }

    #[test]
    fn empty_matrix_is_rejected() {
        let x = from_triplets::<f64>((0, 4), &[]).unwrap();
        assert!(matches!(
            OmegaIndex::from_matrix(&x),
            Err(Error::EmptyMatrix((0, 4)))
        ));
    }

    #[test]
    fn nth_complement_enumerates_complement() {
        let omega = OmegaIndex::from_rows(vec![vec![0, 2, 3, 7], vec![], vec![5]], 9);

        for i in 0..omega.nrows() {
            let complement = omega.complement(i);
            for (t, &j) in complement.iter().enumerate() {
                assert_eq!(omega.nth_complement(i, t), j);
            }
        }
    }

    #[test]
    fn omega_partitions_columns() {
        let mut rng = Xoshiro256Plus::seed_from_u64(21);
        let (x, _, _) = sparse_binary_matrix((50, 100), 5, 0.5, &mut rng);
        let omega = OmegaIndex::from_matrix(&x).unwrap();

        assert_partition(&omega);
        assert_partition(&omega.transpose());
    }

    #[test]
    fn restrict_ignores_out_of_range_columns() {
        let omega = OmegaIndex::from_rows(vec![vec![0, 2], vec![1]], 3);
        let restricted = omega.restrict(&[2, 3, 17]);

        assert_eq!(restricted.ncols(), 3);
        assert_eq!(restricted.row(0), &[2]);
        assert!(restricted.row(1).is_empty());
        assert_partition(&restricted);
    }

    #[test]
    fn restrict_removes_columns_outside_subset() {
        let mut rng = Xoshiro256Plus::seed_from_u64(22);
        let (x, _, _) = sparse_binary_matrix((50, 100), 5, 0.5, &mut rng);
        let omega = OmegaIndex::from_matrix(&x).unwrap();

        for _ in 0..100 {
            let subset = sample(&mut rng, 100, 20).into_vec();
            let in_subset: BTreeSet<_> = subset.iter().copied().collect();
            let restricted = omega.restrict(&subset);

            assert_partition(&restricted);
            for i in 0..omega.nrows() {
                let before: BTreeSet<_> = omega.row(i).iter().copied().collect();
                let after: BTreeSet<_> = restricted.row(i).iter().copied().collect();
                let removed: BTreeSet<_> = before.difference(&after).copied().collect();

                assert!(after.is_subset(&before));
                assert!(removed.is_disjoint(&in_subset));
                let expected: BTreeSet<_> = before.difference(&in_subset).copied().collect();
                assert_eq!(removed, expected);
            }
        }
    }

    #[test]
    fn transpose_swaps_roles() {
        let omega = OmegaIndex::from_rows(vec![vec![0, 2], vec![2]], 3);
        let items = omega.transpose();

        assert_eq!(items.nrows(), 3);
        assert_eq!(items.ncols(), 2);
        assert_eq!(items.row(0), &[0]);
        assert!(items.row(1).is_empty());
        assert_eq!(items.row(2), &[0, 1]);
    }
}
