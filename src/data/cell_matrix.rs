//! Per-cell count matrix for single-cell RNA-seq data

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{PseudobulkError, Result};

/// A per-cell count matrix
/// Rows are genes, columns are cells
///
/// Owned by the upstream data-loading step and immutable once constructed;
/// the aggregator only ever reads from it.
#[derive(Debug, Clone)]
pub struct CellMatrix {
    /// Raw count data (genes x cells)
    counts: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Cell identifiers
    cell_ids: Vec<String>,
}

impl CellMatrix {
    /// Create a new cell matrix from raw data
    pub fn new(counts: Array2<f64>, gene_ids: Vec<String>, cell_ids: Vec<String>) -> Result<Self> {
        let (n_genes, n_cells) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(PseudobulkError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if cell_ids.len() != n_cells {
            return Err(PseudobulkError::DimensionMismatch {
                expected: format!("{} cell IDs", n_cells),
                got: format!("{} cell IDs", cell_ids.len()),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(PseudobulkError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        if let Some(dup) = first_duplicate(&gene_ids) {
            return Err(PseudobulkError::InvalidCountMatrix {
                reason: format!("Duplicate gene ID '{}'", dup),
            });
        }

        if let Some(dup) = first_duplicate(&cell_ids) {
            return Err(PseudobulkError::InvalidCountMatrix {
                reason: format!("Duplicate cell ID '{}'", dup),
            });
        }

        Ok(Self {
            counts,
            gene_ids,
            cell_ids,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of cells
    pub fn n_cells(&self) -> usize {
        self.counts.ncols()
    }

    /// Get the raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get counts for a specific cell
    pub fn cell_counts(&self, cell_idx: usize) -> ArrayView1<'_, f64> {
        self.counts.column(cell_idx)
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get cell IDs
    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }
}

fn first_duplicate(ids: &[String]) -> Option<&String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cell_matrix_creation() {
        let counts = array![[10.0, 20.0, 30.0], [5.0, 15.0, 25.0]];
        let matrix = CellMatrix::new(
            counts,
            vec!["gene1".to_string(), "gene2".to_string()],
            vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
        )
        .unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_cells(), 3);
    }

    #[test]
    fn test_negative_counts_rejected() {
        let counts = array![[10.0, -5.0], [5.0, 15.0]];
        let result = CellMatrix::new(
            counts,
            vec!["gene1".to_string(), "gene2".to_string()],
            vec!["c1".to_string(), "c2".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_cell_ids_rejected() {
        let counts = array![[10.0, 5.0]];
        let result = CellMatrix::new(
            counts,
            vec!["gene1".to_string()],
            vec!["c1".to_string(), "c1".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let counts = array![[10.0, 5.0]];
        let result = CellMatrix::new(
            counts,
            vec!["gene1".to_string(), "gene2".to_string()],
            vec!["c1".to_string(), "c2".to_string()],
        );
        assert!(matches!(
            result,
            Err(PseudobulkError::DimensionMismatch { .. })
        ));
    }
}
