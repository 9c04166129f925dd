//! CSV reading and writing for matrices, annotations and result tables
//!
//! Wide matrices are parsed by hand (delimiter auto-detected, quotes
//! stripped); record-shaped tables go through the csv crate with serde.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::contrast::RankedTable;
use crate::data::{CellAnnotations, CellMatrix, CellRecord, CountMatrix, PseudobulkMetadata};
use crate::error::{PseudobulkError, Result};

/// Fixed suffix of per-cell-type result files
pub const RESULTS_SUFFIX: &str = "_de_results.csv";

/// Strip surrounding quotes from a field
fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')) {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Read a per-cell count matrix
/// Expected format: first column is gene IDs, first row is cell IDs;
/// comma and tab delimiters are auto-detected
pub fn read_cell_matrix<P: AsRef<Path>>(path: P) -> Result<CellMatrix> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = lines.next().ok_or_else(|| PseudobulkError::EmptyData {
        reason: "Empty count matrix file".to_string(),
    })??;

    let delimiter = if header_line.contains('\t') { '\t' } else { ',' };

    let header: Vec<&str> = header_line.split(delimiter).collect();
    if header.len() < 2 {
        return Err(PseudobulkError::InvalidCountMatrix {
            reason: "Not enough columns in header".to_string(),
        });
    }
    let cell_ids: Vec<String> = header[1..].iter().map(|s| strip_quotes(s)).collect();
    let n_cells = cell_ids.len();

    let mut gene_ids: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != n_cells + 1 {
            return Err(PseudobulkError::InvalidCountMatrix {
                reason: format!("Row has {} columns, expected {}", fields.len(), n_cells + 1),
            });
        }

        gene_ids.push(strip_quotes(fields[0]));

        let row: Result<Vec<f64>> = fields[1..]
            .iter()
            .map(|s| {
                let val = strip_quotes(s);
                val.parse::<f64>()
                    .map_err(|_| PseudobulkError::InvalidCountMatrix {
                        reason: format!("Invalid count value: {}", val),
                    })
            })
            .collect();
        rows.push(row?);
    }

    if gene_ids.is_empty() {
        return Err(PseudobulkError::EmptyData {
            reason: "No genes found in count matrix".to_string(),
        });
    }

    let mut counts = Array2::zeros((gene_ids.len(), n_cells));
    for (i, row) in rows.iter().enumerate() {
        for (j, &val) in row.iter().enumerate() {
            counts[[i, j]] = val;
        }
    }

    CellMatrix::new(counts, gene_ids, cell_ids)
}

/// Read per-cell annotations
/// Expected columns: `cell_id,cell_type,sample,condition`
pub fn read_cell_annotations<P: AsRef<Path>>(path: P) -> Result<CellAnnotations> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize::<CellRecord>() {
        records.push(row?);
    }

    CellAnnotations::new(records)
}

/// Write the pseudo-sample count matrix as TSV, integer-valued
pub fn write_count_matrix<P: AsRef<Path>>(path: P, counts: &CountMatrix) -> Result<()> {
    let mut file = File::create(path)?;

    writeln!(file, "gene_id\t{}", counts.labels().join("\t"))?;

    let values = counts.counts();
    for (i, gene_id) in counts.gene_ids().iter().enumerate() {
        let row: Vec<String> = (0..counts.n_columns())
            .map(|j| format!("{:.0}", values[[i, j]]))
            .collect();
        writeln!(file, "{}\t{}", gene_id, row.join("\t"))?;
    }

    Ok(())
}

/// Write the pseudo-sample metadata table as CSV
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &PseudobulkMetadata) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in metadata.records() {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Derive the result filename for a cell type: the label with any character
/// outside `[A-Za-z0-9._-]` mapped to `_`, plus the fixed suffix
pub fn results_filename(cell_type: &str) -> String {
    let sanitized: String = cell_type
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}", sanitized, RESULTS_SUFFIX)
}

/// Write one cell type's ranked result table into `dir`, returning the path
pub fn write_ranked_table<P: AsRef<Path>>(dir: P, table: &RankedTable) -> Result<PathBuf> {
    let path = dir.as_ref().join(results_filename(&table.cell_type));
    let mut writer = csv::Writer::from_path(&path)?;
    for row in &table.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}
