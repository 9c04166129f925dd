//! Size factor estimation using the median of ratios method

use ndarray::{ArrayView2, Axis};

use crate::error::{PseudobulkError, Result};

/// Estimate per-column size factors using the median of ratios method
///
/// Accounts for both sequencing depth and composition bias between
/// pseudo-samples. Genes with a zero count in any column are excluded from
/// the reference geometric means; at least one all-positive gene is required.
pub fn estimate_size_factors(counts: ArrayView2<f64>) -> Result<Vec<f64>> {
    let (n_genes, n_columns) = counts.dim();

    if n_genes == 0 || n_columns == 0 {
        return Err(PseudobulkError::EmptyData {
            reason: "Count matrix is empty".to_string(),
        });
    }

    // Geometric mean per gene, over genes with all-positive counts
    let mut geo_means = Vec::new();
    let mut reference_genes = Vec::new();
    for (i, row) in counts.axis_iter(Axis(0)).enumerate() {
        if row.iter().all(|&x| x > 0.0) {
            let log_sum: f64 = row.iter().map(|&x| x.ln()).sum();
            geo_means.push((log_sum / n_columns as f64).exp());
            reference_genes.push(i);
        }
    }

    if reference_genes.is_empty() {
        return Err(PseudobulkError::SizeFactorFailed {
            reason: "No genes with all non-zero counts found".to_string(),
        });
    }

    // Median ratio to the reference per column
    let mut size_factors = Vec::with_capacity(n_columns);
    for j in 0..n_columns {
        let mut ratios: Vec<f64> = reference_genes
            .iter()
            .zip(geo_means.iter())
            .map(|(&i, &geo_mean)| counts[[i, j]] / geo_mean)
            .collect();
        ratios.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let median = if ratios.len() % 2 == 0 {
            (ratios[ratios.len() / 2 - 1] + ratios[ratios.len() / 2]) / 2.0
        } else {
            ratios[ratios.len() / 2]
        };
        size_factors.push(median);
    }

    if size_factors.iter().any(|&s| s <= 0.0 || !s.is_finite()) {
        return Err(PseudobulkError::SizeFactorFailed {
            reason: "Invalid size factors computed".to_string(),
        });
    }

    Ok(size_factors)
}
