//! Cluster-wise pseudobulk differential expression
//!
//! This crate aggregates per-cell RNA-seq counts into one pseudo-sample per
//! (cell type, sample) pair, derives a sample-level metadata table from the
//! pseudo-sample labels, and extracts a STIM vs CTRL contrast per cell type
//! from a shared negative-binomial fit.
//!
//! # Example
//!
//! ```ignore
//! use pseudobulk_de::prelude::*;
//!
//! // Load data
//! let cells = read_cell_matrix("counts.csv")?;
//! let annotations = read_cell_annotations("annotations.csv")?;
//!
//! // Aggregate into pseudo-samples and derive metadata
//! let (counts, metadata) = build_pseudobulk(&cells, &annotations, 10)?;
//!
//! // One ranked result table per cell type
//! let engine = SseqEngine::default();
//! let (tables, report) = run_contrast_analysis(&counts, &metadata, &engine)?;
//! ```

pub mod aggregate;
pub mod cli;
pub mod contrast;
pub mod data;
pub mod engine;
pub mod error;
pub mod io;
pub mod labels;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregate::aggregate_counts;
    pub use crate::contrast::{run_contrasts, RankedRow, RankedTable, RunReport, SkippedContrast};
    pub use crate::data::{
        CellAnnotations, CellMatrix, CellRecord, CountMatrix, PseudobulkMetadata, SampleRecord,
    };
    pub use crate::engine::{ContrastEngine, ContrastTable, FittedModel, SseqEngine};
    pub use crate::error::{PseudobulkError, Result};
    pub use crate::io::{
        read_cell_annotations, read_cell_matrix, results_filename, write_count_matrix,
        write_metadata, write_ranked_table,
    };
    pub use crate::labels::{group_label, Condition, SampleLabel};
    pub use crate::{build_pseudobulk, run_contrast_analysis};
}

use std::collections::BTreeMap;

use prelude::*;

/// Aggregate per-cell counts and derive the pseudo-sample metadata table
///
/// Aggregation and label decomposition are fatal on error: a pseudobulk
/// table whose labels cannot be parsed is unusable downstream.
pub fn build_pseudobulk(
    cells: &CellMatrix,
    annotations: &CellAnnotations,
    min_cells: usize,
) -> Result<(CountMatrix, PseudobulkMetadata)> {
    let counts = aggregate_counts(cells, annotations, min_cells)?;
    let labels: Vec<&str> = counts.labels().iter().map(|l| l.as_str()).collect();
    let metadata = PseudobulkMetadata::from_labels(labels)?;
    Ok((counts, metadata))
}

/// Fit the engine once and extract every cell type's STIM vs CTRL contrast
///
/// The returned report lists the cell types that produced a ranked table and
/// the ones that were skipped with the reason for each.
pub fn run_contrast_analysis(
    counts: &CountMatrix,
    metadata: &PseudobulkMetadata,
    engine: &dyn ContrastEngine,
) -> Result<(BTreeMap<String, RankedTable>, RunReport)> {
    metadata.verify_alignment(counts)?;
    let model = engine.fit(counts, metadata)?;
    Ok(run_contrasts(model.as_ref(), metadata))
}
