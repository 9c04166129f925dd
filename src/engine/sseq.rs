//! Default contrast engine: shared negative-binomial fit over pseudo-samples
//!
//! The fit follows the sSeq method (Yu, Huber and Vitek 2013): per-column
//! size factors, per-gene means and variances of normalized counts, and
//! method-of-moments dispersions shrunk toward a high quantile. Contrasts
//! pool the counts of each composite group and apply a negative-binomial
//! exact test, switching to the beta approximation for large totals.

use ndarray::Array2;
use rayon::prelude::*;

use super::fdr::benjamini_hochberg;
use super::nb::{nb_asymptotic_test, nb_exact_test};
use super::size_factors::estimate_size_factors;
use super::{ContrastEngine, ContrastTable, FittedModel};
use crate::data::{CountMatrix, PseudobulkMetadata};
use crate::error::{PseudobulkError, Result};

/// Default quantile of the moment dispersions used as shrinkage target
pub const ZETA_QUANTILE_DEFAULT: f64 = 0.995;
/// Default pooled-count threshold above which the beta approximation is used
pub const BIG_COUNT_DEFAULT: u64 = 900;

/// Negative-binomial contrast engine with sSeq dispersion shrinkage
#[derive(Debug, Clone)]
pub struct SseqEngine {
    /// Quantile of the moment dispersions used as shrinkage target
    pub zeta_quantile: f64,
    /// Pooled-count threshold for switching to the beta approximation
    pub big_count: u64,
}

impl Default for SseqEngine {
    fn default() -> Self {
        Self {
            zeta_quantile: ZETA_QUANTILE_DEFAULT,
            big_count: BIG_COUNT_DEFAULT,
        }
    }
}

/// Read-only fitted parameters shared by every contrast extraction
#[derive(Debug)]
pub struct SseqModel {
    gene_ids: Vec<String>,
    /// Unique composite groups, sorted
    groups: Vec<String>,
    /// Composite group of each pseudo-sample column
    group_of: Vec<String>,
    counts: Array2<f64>,
    size_factors: Vec<f64>,
    /// Common per-gene mean of normalized counts
    gene_means: Vec<f64>,
    /// Shrunken per-gene dispersion
    gene_dispersions: Vec<f64>,
    /// Genes with non-zero variance of normalized counts; the rest are
    /// untestable and get NaN p-values
    tested: Vec<bool>,
    big_count: u64,
}

impl ContrastEngine for SseqEngine {
    fn fit(
        &self,
        counts: &CountMatrix,
        metadata: &PseudobulkMetadata,
    ) -> Result<Box<dyn FittedModel>> {
        metadata.verify_alignment(counts)?;

        if !(0.0..=1.0).contains(&self.zeta_quantile) {
            return Err(PseudobulkError::InvalidInput {
                reason: format!("zeta quantile {} outside [0, 1]", self.zeta_quantile),
            });
        }

        let n_genes = counts.n_genes();
        let n_columns = counts.n_columns();
        let raw = counts.counts();

        let size_factors = estimate_size_factors(raw)?;
        let inv_sf_sum: f64 = size_factors.iter().map(|s| 1.0 / s).sum();

        // Per-gene mean and sample variance of normalized counts
        let mut gene_means = vec![0.0; n_genes];
        let mut gene_vars = vec![0.0; n_genes];
        for i in 0..n_genes {
            let normalized: Vec<f64> = (0..n_columns)
                .map(|j| raw[[i, j]] / size_factors[j])
                .collect();
            let mean = normalized.iter().sum::<f64>() / n_columns as f64;
            gene_means[i] = mean;
            if n_columns > 1 {
                gene_vars[i] = normalized.iter().map(|y| (y - mean).powi(2)).sum::<f64>()
                    / (n_columns - 1) as f64;
            }
        }

        let tested: Vec<bool> = gene_vars.iter().map(|&v| v > 0.0).collect();

        // Method-of-moments dispersion per gene
        let n = n_columns as f64;
        let moment_phi: Vec<f64> = (0..n_genes)
            .map(|i| {
                if tested[i] && gene_means[i] > 0.0 {
                    let mu = gene_means[i];
                    ((n * gene_vars[i] - mu * inv_sf_sum) / (mu * mu * inv_sf_sum)).max(0.0)
                } else {
                    0.0
                }
            })
            .collect();

        // Shrink toward a high quantile of the moment estimates
        let used: Vec<f64> = (0..n_genes)
            .filter(|&i| tested[i])
            .map(|i| moment_phi[i])
            .collect();
        let gene_dispersions = if used.is_empty() {
            vec![0.0; n_genes]
        } else {
            let zeta_hat = quantile(&used, self.zeta_quantile);
            let mean_phi = used.iter().sum::<f64>() / used.len() as f64;
            let g = n_genes as f64;
            let numerator = used.iter().map(|p| (p - mean_phi).powi(2)).sum::<f64>() / (g - 1.0);
            let denominator = used.iter().map(|p| (p - zeta_hat).powi(2)).sum::<f64>() / (g - 2.0);
            let mut delta = numerator / denominator;
            if !delta.is_finite() {
                delta = 0.0;
            }
            (0..n_genes)
                .map(|i| {
                    if tested[i] {
                        (1.0 - delta) * moment_phi[i] + delta * zeta_hat
                    } else {
                        0.0
                    }
                })
                .collect()
        };

        Ok(Box::new(SseqModel {
            gene_ids: counts.gene_ids().to_vec(),
            groups: metadata.groups(),
            group_of: metadata.records().iter().map(|r| r.group.clone()).collect(),
            counts: raw.to_owned(),
            size_factors,
            gene_means,
            gene_dispersions,
            tested,
            big_count: self.big_count,
        }))
    }
}

impl SseqModel {
    fn columns_of(&self, group: &str) -> Vec<usize> {
        self.group_of
            .iter()
            .enumerate()
            .filter(|(_, g)| g.as_str() == group)
            .map(|(j, _)| j)
            .collect()
    }

    fn pooled_counts(&self, columns: &[usize]) -> Vec<u64> {
        (0..self.gene_ids.len())
            .map(|i| {
                columns
                    .iter()
                    .map(|&j| self.counts[[i, j]])
                    .sum::<f64>()
                    .round() as u64
            })
            .collect()
    }
}

impl FittedModel for SseqModel {
    fn groups(&self) -> &[String] {
        &self.groups
    }

    fn contrast(&self, numerator: &str, denominator: &str) -> Result<ContrastTable> {
        if numerator == denominator {
            return Err(PseudobulkError::InvalidContrast {
                reason: format!("contrast of '{}' against itself", numerator),
            });
        }

        let cols_a = self.columns_of(numerator);
        if cols_a.is_empty() {
            return Err(PseudobulkError::MissingContrastGroup {
                group: numerator.to_string(),
            });
        }
        let cols_b = self.columns_of(denominator);
        if cols_b.is_empty() {
            return Err(PseudobulkError::MissingContrastGroup {
                group: denominator.to_string(),
            });
        }

        let s_a: f64 = cols_a.iter().map(|&j| self.size_factors[j]).sum();
        let s_b: f64 = cols_b.iter().map(|&j| self.size_factors[j]).sum();
        let x_a = self.pooled_counts(&cols_a);
        let x_b = self.pooled_counts(&cols_b);

        let big_count = self.big_count;
        let pvalues: Vec<f64> = (0..self.gene_ids.len())
            .into_par_iter()
            .map(|i| {
                if !self.tested[i] {
                    return f64::NAN;
                }
                let (mu, phi) = (self.gene_means[i], self.gene_dispersions[i]);
                if x_a[i] > big_count && x_b[i] > big_count {
                    nb_asymptotic_test(x_a[i], x_b[i], s_a, s_b, mu, phi)
                } else {
                    nb_exact_test(x_a[i], x_b[i], s_a, s_b, mu, phi)
                }
            })
            .collect();

        let padj = benjamini_hochberg(&pvalues);

        // Pseudo-count of 1 keeps zero-count groups finite
        let log2_fold_changes: Vec<f64> = x_a
            .iter()
            .zip(x_b.iter())
            .map(|(&a, &b)| {
                ((1 + a) as f64 / (1.0 + s_a)).log2() - ((1 + b) as f64 / (1.0 + s_b)).log2()
            })
            .collect();

        Ok(ContrastTable {
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
            gene_ids: self.gene_ids.clone(),
            log2_fold_changes,
            pvalues,
            padj,
        })
    }
}

/// Linear-interpolated quantile of an unsorted sample, `q` in [0, 1]
fn quantile(values: &[f64], q: f64) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    if sorted.len() == 1 || q >= 1.0 {
        return sorted[sorted.len() - 1];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - rank.floor();
    sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
}
