//! Sum per-cell counts into pseudo-samples
//!
//! One pseudo-sample per observed (cell type, sample) pair; partitions with
//! zero cells simply do not appear as columns.

use std::collections::HashMap;

use log::{debug, warn};
use ndarray::Array2;

use crate::data::{CellAnnotations, CellMatrix, CountMatrix};
use crate::error::Result;
use crate::labels::LABEL_SEPARATOR;

/// Sum per-cell counts into one column per (cell type, sample) pair
///
/// Column labels concatenate the cell type and the sample identifier with a
/// fixed separator, e.g. `Mono` + `CTRL_101` -> `Mono_CTRL_101`, and come out
/// in sorted label order so that repeated runs produce identical matrices.
/// Sums are rounded once, after aggregation; partitions smaller than
/// `min_cells` are kept but flagged in the log.
pub fn aggregate_counts(
    cells: &CellMatrix,
    annotations: &CellAnnotations,
    min_cells: usize,
) -> Result<CountMatrix> {
    annotations.verify_alignment(cells)?;

    let n_genes = cells.n_genes();
    let counts = cells.counts();

    // Partition cells by (cell type, sample)
    let mut partitions: HashMap<String, Vec<usize>> = HashMap::new();
    for (cell_idx, record) in annotations.records().iter().enumerate() {
        let label = format!(
            "{}{}{}",
            record.cell_type, LABEL_SEPARATOR, record.sample
        );
        partitions.entry(label).or_default().push(cell_idx);
    }

    // Sorted label order keeps output deterministic across runs
    let mut labels: Vec<String> = partitions.keys().cloned().collect();
    labels.sort();

    let mut summed = Array2::zeros((n_genes, labels.len()));
    for (new_j, label) in labels.iter().enumerate() {
        let members = &partitions[label];
        if members.len() < min_cells {
            warn!(
                "pseudo-sample '{}' aggregates only {} cells (minimum {})",
                label,
                members.len(),
                min_cells
            );
        }
        for &cell_j in members {
            for i in 0..n_genes {
                summed[[i, new_j]] += counts[[i, cell_j]];
            }
        }
    }

    summed.mapv_inplace(f64::round);

    debug!(
        "aggregated {} cells into {} pseudo-samples",
        cells.n_cells(),
        labels.len()
    );

    CountMatrix::new(summed, cells.gene_ids().to_vec(), labels)
}
