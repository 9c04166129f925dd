//! Per-cell annotations: cell type, sample identifier, stimulation condition

use serde::Deserialize;

use super::CellMatrix;
use crate::error::{PseudobulkError, Result};
use crate::labels::{Condition, LABEL_SEPARATOR};

/// Annotation record for one cell
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CellRecord {
    /// Cell identifier (matches a column of the cell matrix)
    pub cell_id: String,
    /// Assigned cell-type label
    pub cell_type: String,
    /// Sample identifier, e.g. `CTRL_101`
    pub sample: String,
    /// Stimulation condition
    pub condition: Condition,
}

/// Per-cell annotation table
///
/// One record per cell, in the same order as the cell matrix columns.
/// Both grouping keys (cell type, sample) must be non-missing for every cell,
/// and each cell's condition token must prefix its sample identifier.
#[derive(Debug, Clone)]
pub struct CellAnnotations {
    records: Vec<CellRecord>,
}

impl CellAnnotations {
    /// Create an annotation table, validating every record
    pub fn new(records: Vec<CellRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(PseudobulkError::EmptyData {
                reason: "No cell annotations".to_string(),
            });
        }

        for record in &records {
            if record.cell_type.trim().is_empty() {
                return Err(PseudobulkError::InvalidAnnotations {
                    reason: format!("cell '{}' has no cell-type label", record.cell_id),
                });
            }
            if record.sample.trim().is_empty() {
                return Err(PseudobulkError::InvalidAnnotations {
                    reason: format!("cell '{}' has no sample identifier", record.cell_id),
                });
            }
            let expected_prefix = format!("{}{}", record.condition.token(), LABEL_SEPARATOR);
            if !record.sample.starts_with(&expected_prefix) {
                return Err(PseudobulkError::InvalidAnnotations {
                    reason: format!(
                        "cell '{}': sample '{}' does not carry its condition token '{}'",
                        record.cell_id,
                        record.sample,
                        record.condition
                    ),
                });
            }
        }

        Ok(Self { records })
    }

    /// Get all records
    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    /// Get the number of annotated cells
    pub fn n_cells(&self) -> usize {
        self.records.len()
    }

    /// Check that the annotations line up 1:1, in order, with the matrix columns
    pub fn verify_alignment(&self, cells: &CellMatrix) -> Result<()> {
        if self.records.len() != cells.n_cells() {
            return Err(PseudobulkError::MisalignedMetadata {
                reason: format!(
                    "matrix has {} cells, annotations have {}",
                    cells.n_cells(),
                    self.records.len()
                ),
            });
        }
        for (idx, (record, cell_id)) in self.records.iter().zip(cells.cell_ids()).enumerate() {
            if &record.cell_id != cell_id {
                return Err(PseudobulkError::MisalignedMetadata {
                    reason: format!(
                        "column {} is '{}' in the matrix but '{}' in the annotations",
                        idx, cell_id, record.cell_id
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn record(cell: &str, cell_type: &str, sample: &str, condition: Condition) -> CellRecord {
        CellRecord {
            cell_id: cell.to_string(),
            cell_type: cell_type.to_string(),
            sample: sample.to_string(),
            condition,
        }
    }

    #[test]
    fn test_valid_annotations() {
        let annotations = CellAnnotations::new(vec![
            record("c1", "Mono", "CTRL_101", Condition::Ctrl),
            record("c2", "Mono", "STIM_101", Condition::Stim),
        ])
        .unwrap();
        assert_eq!(annotations.n_cells(), 2);
    }

    #[test]
    fn test_missing_cell_type_rejected() {
        let result = CellAnnotations::new(vec![record("c1", " ", "CTRL_101", Condition::Ctrl)]);
        assert!(matches!(
            result,
            Err(PseudobulkError::InvalidAnnotations { .. })
        ));
    }

    #[test]
    fn test_condition_sample_mismatch_rejected() {
        let result = CellAnnotations::new(vec![record("c1", "Mono", "CTRL_101", Condition::Stim)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_alignment_check() {
        let cells = CellMatrix::new(
            array![[1.0, 2.0]],
            vec!["gene1".to_string()],
            vec!["c1".to_string(), "c2".to_string()],
        )
        .unwrap();

        let aligned = CellAnnotations::new(vec![
            record("c1", "Mono", "CTRL_101", Condition::Ctrl),
            record("c2", "Mono", "CTRL_101", Condition::Ctrl),
        ])
        .unwrap();
        assert!(aligned.verify_alignment(&cells).is_ok());

        let permuted = CellAnnotations::new(vec![
            record("c2", "Mono", "CTRL_101", Condition::Ctrl),
            record("c1", "Mono", "CTRL_101", Condition::Ctrl),
        ])
        .unwrap();
        assert!(matches!(
            permuted.verify_alignment(&cells),
            Err(PseudobulkError::MisalignedMetadata { .. })
        ));
    }
}
