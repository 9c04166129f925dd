//! Per-cell-type contrast extraction
//!
//! For every distinct cell type the runner asks the fitted model for the
//! `<ct>_STIM` vs `<ct>_CTRL` contrast, drops untested genes, and ranks the
//! rest by adjusted p-value. A failure inside one cell type is recorded and
//! skipped; it never aborts the sibling contrasts.

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::data::PseudobulkMetadata;
use crate::engine::{ContrastTable, FittedModel};
use crate::labels::{group_label, Condition};

/// One ranked row of a contrast result table
#[derive(Debug, Clone, Serialize)]
pub struct RankedRow {
    /// Gene identifier
    pub gene: String,
    /// Log2 fold change, STIM over CTRL
    pub log2_fold_change: f64,
    /// Raw p-value
    pub pvalue: f64,
    /// BH-adjusted p-value
    pub padj: f64,
    /// 1-based rank by ascending adjusted p-value
    pub rank: usize,
}

/// Ranked results of one cell type's STIM vs CTRL contrast
#[derive(Debug, Clone)]
pub struct RankedTable {
    /// Cell-type label
    pub cell_type: String,
    /// Numerator composite group, e.g. `Mono_STIM`
    pub numerator: String,
    /// Denominator composite group, e.g. `Mono_CTRL`
    pub denominator: String,
    /// Rows sorted ascending by adjusted p-value; untested genes dropped
    pub rows: Vec<RankedRow>,
}

/// A cell type whose contrast could not be extracted
#[derive(Debug, Clone)]
pub struct SkippedContrast {
    pub cell_type: String,
    pub reason: String,
}

/// Completion summary: which cell types produced a table, which were skipped
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// (cell type, number of ranked genes) per completed contrast
    pub processed: Vec<(String, usize)>,
    /// Skipped cell types with reasons
    pub skipped: Vec<SkippedContrast>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pseudobulk contrast summary")?;
        writeln!(f, "===========================")?;
        writeln!(f, "Cell types processed: {}", self.processed.len())?;
        for (cell_type, n_ranked) in &self.processed {
            writeln!(f, "  {}: {} ranked genes", cell_type, n_ranked)?;
        }
        writeln!(f, "Cell types skipped: {}", self.skipped.len())?;
        for skip in &self.skipped {
            writeln!(f, "  {}: {}", skip.cell_type, skip.reason)?;
        }
        Ok(())
    }
}

/// Extract the STIM vs CTRL contrast for every cell type in the metadata
///
/// The fitted model is shared read-only across cell types and the loop runs
/// on the rayon pool; results come back as an explicit cell-type keyed map so
/// that persistence stays a separate concern.
pub fn run_contrasts(
    model: &dyn FittedModel,
    metadata: &PseudobulkMetadata,
) -> (BTreeMap<String, RankedTable>, RunReport) {
    let cell_types = metadata.cell_types();

    let outcomes: Vec<(String, Result<RankedTable, String>)> = cell_types
        .into_par_iter()
        .map(|cell_type| {
            let numerator = group_label(&cell_type, Condition::Stim);
            let denominator = group_label(&cell_type, Condition::Ctrl);
            let outcome = model
                .contrast(&numerator, &denominator)
                .map(|table| rank_table(&cell_type, table))
                .map_err(|e| e.to_string());
            (cell_type, outcome)
        })
        .collect();

    let mut tables = BTreeMap::new();
    let mut report = RunReport::default();

    for (cell_type, outcome) in outcomes {
        match outcome {
            Ok(table) => {
                info!(
                    "{}: {} vs {}, {} ranked genes",
                    cell_type,
                    table.numerator,
                    table.denominator,
                    table.rows.len()
                );
                report.processed.push((cell_type.clone(), table.rows.len()));
                tables.insert(cell_type, table);
            }
            Err(reason) => {
                warn!("skipping cell type '{}': {}", cell_type, reason);
                report.skipped.push(SkippedContrast { cell_type, reason });
            }
        }
    }

    (tables, report)
}

/// Drop untested genes, sort ascending by adjusted p-value, assign ranks
///
/// Ties break on raw p-value and then gene identifier so that repeated runs
/// produce byte-identical tables.
fn rank_table(cell_type: &str, table: ContrastTable) -> RankedTable {
    let ContrastTable {
        numerator,
        denominator,
        gene_ids,
        log2_fold_changes,
        pvalues,
        padj,
    } = table;

    let mut rows: Vec<RankedRow> = gene_ids
        .into_iter()
        .zip(log2_fold_changes)
        .zip(pvalues)
        .zip(padj)
        .filter(|(_, padj)| padj.is_finite())
        .map(|(((gene, log2_fold_change), pvalue), padj)| RankedRow {
            gene,
            log2_fold_change,
            pvalue,
            padj,
            rank: 0,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.padj
            .partial_cmp(&b.padj)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.pvalue
                    .partial_cmp(&b.pvalue)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.gene.cmp(&b.gene))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }

    RankedTable {
        cell_type: cell_type.to_string(),
        numerator,
        denominator,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CountMatrix;
    use crate::engine::{ContrastEngine, SseqEngine};
    use ndarray::array;

    fn fitted() -> (Box<dyn FittedModel>, PseudobulkMetadata) {
        // Mono has both conditions; DC is observed under CTRL only
        let counts = CountMatrix::new(
            array![
                [50.0, 50.0, 50.0, 50.0, 50.0],
                [10.0, 10.0, 100.0, 100.0, 40.0],
                [100.0, 100.0, 10.0, 10.0, 40.0],
                [30.0, 30.0, 30.0, 30.0, 30.0]
            ],
            vec![
                "gene_const".to_string(),
                "gene_up".to_string(),
                "gene_down".to_string(),
                "gene_house".to_string(),
            ],
            vec![
                "Mono_CTRL_101".to_string(),
                "Mono_CTRL_102".to_string(),
                "Mono_STIM_101".to_string(),
                "Mono_STIM_102".to_string(),
                "DC_CTRL_101".to_string(),
            ],
        )
        .unwrap();
        let labels: Vec<&str> = counts.labels().iter().map(|s| s.as_str()).collect();
        let metadata = PseudobulkMetadata::from_labels(labels).unwrap();
        let model = SseqEngine::default().fit(&counts, &metadata).unwrap();
        (model, metadata)
    }

    #[test]
    fn test_one_sided_cell_type_is_skipped_not_fatal() {
        let (model, metadata) = fitted();
        let (tables, report) = run_contrasts(model.as_ref(), &metadata);

        assert_eq!(tables.len(), 1);
        assert!(tables.contains_key("Mono"));

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].cell_type, "DC");
        assert!(report.skipped[0].reason.contains("DC_STIM"));
    }

    #[test]
    fn test_rows_are_ranked_ascending_with_no_nan() {
        let (model, metadata) = fitted();
        let (tables, _) = run_contrasts(model.as_ref(), &metadata);
        let mono = &tables["Mono"];

        assert_eq!(mono.numerator, "Mono_STIM");
        assert_eq!(mono.denominator, "Mono_CTRL");
        assert!(!mono.rows.is_empty());

        for (idx, row) in mono.rows.iter().enumerate() {
            assert!(row.padj.is_finite());
            assert_eq!(row.rank, idx + 1);
        }
        for pair in mono.rows.windows(2) {
            assert!(pair[0].padj <= pair[1].padj);
        }
    }

    #[test]
    fn test_report_display_lists_both_outcomes() {
        let (model, metadata) = fitted();
        let (_, report) = run_contrasts(model.as_ref(), &metadata);
        let text = report.to_string();
        assert!(text.contains("Cell types processed: 1"));
        assert!(text.contains("Cell types skipped: 1"));
        assert!(text.contains("DC"));
    }
}
