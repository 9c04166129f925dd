//! Pseudo-sample count matrix

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{PseudobulkError, Result};

/// An aggregated count matrix
/// Rows are genes, columns are pseudo-samples
///
/// Values are per-gene sums over the cells of each (cell type, sample)
/// partition and are therefore non-negative integers; the constructor
/// enforces both.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    /// Summed count data (genes x pseudo-samples)
    counts: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Pseudo-sample labels, e.g. `Mono_CTRL_101`
    labels: Vec<String>,
}

impl CountMatrix {
    /// Create a new pseudo-sample count matrix
    pub fn new(counts: Array2<f64>, gene_ids: Vec<String>, labels: Vec<String>) -> Result<Self> {
        let (n_genes, n_columns) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(PseudobulkError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if labels.len() != n_columns {
            return Err(PseudobulkError::DimensionMismatch {
                expected: format!("{} column labels", n_columns),
                got: format!("{} column labels", labels.len()),
            });
        }

        if n_genes == 0 || n_columns == 0 {
            return Err(PseudobulkError::EmptyData {
                reason: "Pseudo-sample count matrix has no data".to_string(),
            });
        }

        if counts
            .iter()
            .any(|&x| x < 0.0 || !x.is_finite() || x != x.round())
        {
            return Err(PseudobulkError::InvalidCountMatrix {
                reason: "Pseudo-sample counts must be non-negative integers".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(labels.len());
        if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(PseudobulkError::DuplicateSampleLabel { label: dup.clone() });
        }

        Ok(Self {
            counts,
            gene_ids,
            labels,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of pseudo-samples
    pub fn n_columns(&self) -> usize {
        self.counts.ncols()
    }

    /// Get the counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get counts for a specific pseudo-sample
    pub fn column(&self, column_idx: usize) -> ArrayView1<'_, f64> {
        self.counts.column(column_idx)
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get pseudo-sample labels
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Get the column index of a pseudo-sample label
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Total counts per pseudo-sample
    pub fn column_sums(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(1))
            .map(|col| col.sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_integral_counts_accepted() {
        let matrix = CountMatrix::new(
            array![[10.0, 20.0], [5.0, 0.0]],
            vec!["gene1".to_string(), "gene2".to_string()],
            vec!["Mono_CTRL_101".to_string(), "Mono_STIM_101".to_string()],
        )
        .unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_columns(), 2);
        assert_eq!(matrix.column_sums(), vec![15.0, 20.0]);
    }

    #[test]
    fn test_fractional_counts_rejected() {
        let result = CountMatrix::new(
            array![[10.5]],
            vec!["gene1".to_string()],
            vec!["Mono_CTRL_101".to_string()],
        );
        assert!(matches!(
            result,
            Err(PseudobulkError::InvalidCountMatrix { .. })
        ));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let result = CountMatrix::new(
            array![[1.0, 2.0]],
            vec!["gene1".to_string()],
            vec!["Mono_CTRL_101".to_string(), "Mono_CTRL_101".to_string()],
        );
        assert!(matches!(
            result,
            Err(PseudobulkError::DuplicateSampleLabel { .. })
        ));
    }
}
