//! Differential-expression engine seam
//!
//! The pipeline treats the count-based statistics as an external collaborator
//! behind two traits: an engine that is fitted once over the whole
//! pseudo-sample matrix, and the resulting read-only model from which each
//! cell type's contrast is extracted. The bundled default is [`SseqEngine`];
//! anything that can produce per-gene fold changes and adjusted p-values for
//! a pair of composite groups can stand in for it.

mod fdr;
mod nb;
mod size_factors;
mod sseq;

pub use fdr::benjamini_hochberg;
pub use nb::{nb_asymptotic_test, nb_exact_test};
pub use size_factors::estimate_size_factors;
pub use sseq::{SseqEngine, SseqModel};

use crate::data::{CountMatrix, PseudobulkMetadata};
use crate::error::Result;

/// Per-gene results for one contrast, unfiltered and unranked
///
/// A NaN adjusted p-value marks a gene the engine declined to test; the
/// contrast runner drops those rows before ranking.
#[derive(Debug, Clone)]
pub struct ContrastTable {
    /// Numerator composite group, e.g. `Mono_STIM`
    pub numerator: String,
    /// Denominator composite group, e.g. `Mono_CTRL`
    pub denominator: String,
    /// Gene identifiers
    pub gene_ids: Vec<String>,
    /// Log2 fold change, numerator over denominator
    pub log2_fold_changes: Vec<f64>,
    /// Raw p-values
    pub pvalues: Vec<f64>,
    /// BH-adjusted p-values
    pub padj: Vec<f64>,
}

impl ContrastTable {
    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }
}

/// A model fitted once and shared read-only across contrast extractions
pub trait FittedModel: Send + Sync {
    /// Composite group labels the model was fitted with
    fn groups(&self) -> &[String];

    /// Check whether a composite group has any pseudo-samples
    fn has_group(&self, group: &str) -> bool {
        self.groups().iter().any(|g| g == group)
    }

    /// Extract per-gene effect sizes and significance for one group pair
    fn contrast(&self, numerator: &str, denominator: &str) -> Result<ContrastTable>;
}

/// A count-based differential-expression engine
pub trait ContrastEngine {
    /// Fit the shared model over the full pseudo-sample matrix, grouping
    /// columns by the metadata's composite group labels
    fn fit(
        &self,
        counts: &CountMatrix,
        metadata: &PseudobulkMetadata,
    ) -> Result<Box<dyn FittedModel>>;
}
