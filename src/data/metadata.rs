//! Pseudo-sample metadata table

use std::collections::HashSet;

use serde::Serialize;

use super::CountMatrix;
use crate::error::{PseudobulkError, Result};
use crate::labels::{Condition, SampleLabel};

/// Metadata record for one pseudo-sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    /// Pseudo-sample label, e.g. `Mono_CTRL_101`
    pub sample: String,
    /// Composite group label, e.g. `Mono_CTRL`
    pub group: String,
    /// Stimulation condition
    pub condition: Condition,
    /// Cell-type label, e.g. `Mono`
    pub cell_type: String,
}

/// Sample-level metadata derived from pseudo-sample labels
///
/// Exactly one record per pseudo-sample, in the order of the aggregated
/// matrix columns. The composite group label is the grouping factor for
/// differential-expression contrasts.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudobulkMetadata {
    records: Vec<SampleRecord>,
}

impl PseudobulkMetadata {
    /// Build the metadata table by decomposing pseudo-sample labels
    ///
    /// Fails on the first unparseable label and on duplicate labels; a
    /// partially-parsed table would poison every downstream contrast.
    pub fn from_labels<'a, I>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for label in labels {
            if !seen.insert(label.to_string()) {
                return Err(PseudobulkError::DuplicateSampleLabel {
                    label: label.to_string(),
                });
            }
            let parsed = SampleLabel::parse(label)?;
            records.push(SampleRecord {
                sample: parsed.label.clone(),
                group: parsed.group(),
                condition: parsed.condition,
                cell_type: parsed.cell_type,
            });
        }

        if records.is_empty() {
            return Err(PseudobulkError::EmptyData {
                reason: "No pseudo-sample labels".to_string(),
            });
        }

        Ok(Self { records })
    }

    /// Get all records
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Get the number of pseudo-samples
    pub fn n_samples(&self) -> usize {
        self.records.len()
    }

    /// Unique cell-type labels, sorted
    pub fn cell_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.records.iter().map(|r| r.cell_type.clone()).collect();
        types.sort();
        types.dedup();
        types
    }

    /// Unique composite group labels, sorted
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.records.iter().map(|r| r.group.clone()).collect();
        groups.sort();
        groups.dedup();
        groups
    }

    /// Column indices of the pseudo-samples in a composite group
    pub fn group_columns(&self, group: &str) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.group == group)
            .map(|(i, _)| i)
            .collect()
    }

    /// Check whether any pseudo-sample belongs to a composite group
    pub fn has_group(&self, group: &str) -> bool {
        self.records.iter().any(|r| r.group == group)
    }

    /// Check that metadata rows and matrix columns are the same labels in
    /// the same order
    pub fn verify_alignment(&self, counts: &CountMatrix) -> Result<()> {
        if self.records.len() != counts.n_columns() {
            return Err(PseudobulkError::MisalignedMetadata {
                reason: format!(
                    "matrix has {} columns, metadata has {} rows",
                    counts.n_columns(),
                    self.records.len()
                ),
            });
        }
        for (idx, (record, label)) in self.records.iter().zip(counts.labels()).enumerate() {
            if &record.sample != label {
                return Err(PseudobulkError::MisalignedMetadata {
                    reason: format!(
                        "position {} is '{}' in the matrix but '{}' in the metadata",
                        idx, label, record.sample
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

    #[test]
    fn test_from_labels() {
        let metadata = PseudobulkMetadata::from_labels(
            ["Mono_CTRL_101", "Mono_STIM_101", "DC_CTRL_101", "DC_STIM_1016"]
                .into_iter(),
        )
        .unwrap();

        assert_eq!(metadata.n_samples(), 4);
        assert_eq!(metadata.cell_types(), vec!["DC", "Mono"]);
        assert_eq!(
            metadata.groups(),
            vec!["DC_CTRL", "DC_STIM", "Mono_CTRL", "Mono_STIM"]
        );
        assert_eq!(metadata.group_columns("Mono_STIM"), vec![1]);
        assert!(metadata.has_group("DC_CTRL"));
        assert!(!metadata.has_group("DC_MOCK"));

        let record = &metadata.records()[0];
        assert_eq!(record.sample, "Mono_CTRL_101");
        assert_eq!(record.group, "Mono_CTRL");
        assert_eq!(record.condition, Condition::Ctrl);
        assert_eq!(record.cell_type, "Mono");
    }

    #[test]
    fn test_single_label_still_builds() {
        let metadata = PseudobulkMetadata::from_labels(["Mono_CTRL_101"].into_iter()).unwrap();
        assert_eq!(metadata.n_samples(), 1);
    }

    #[test]
    fn test_unparseable_label_is_fatal() {
        let result =
            PseudobulkMetadata::from_labels(["Mono_CTRL_101", "Bcell_STIM_12"].into_iter());
        assert!(matches!(
            result,
            Err(PseudobulkError::InvalidSampleLabel { .. })
        ));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let result =
            PseudobulkMetadata::from_labels(["Mono_CTRL_101", "Mono_CTRL_101"].into_iter());
        assert!(matches!(
            result,
            Err(PseudobulkError::DuplicateSampleLabel { .. })
        ));
    }

    #[test]
    fn test_alignment_detects_permutation() {
        let metadata =
            PseudobulkMetadata::from_labels(["Mono_CTRL_101", "Mono_STIM_101"].into_iter())
                .unwrap();

        let aligned = CountMatrix::new(
            array![[1.0, 2.0]],
            vec!["gene1".to_string()],
            vec!["Mono_CTRL_101".to_string(), "Mono_STIM_101".to_string()],
        )
        .unwrap();
        assert!(metadata.verify_alignment(&aligned).is_ok());

        let permuted = CountMatrix::new(
            array![[1.0, 2.0]],
            vec!["gene1".to_string()],
            vec!["Mono_STIM_101".to_string(), "Mono_CTRL_101".to_string()],
        )
        .unwrap();
        assert!(matches!(
            metadata.verify_alignment(&permuted),
            Err(PseudobulkError::MisalignedMetadata { .. })
        ));
    }
}
