//! Input/Output operations for the pseudobulk pipeline

mod csv;

pub use self::csv::{
    read_cell_annotations, read_cell_matrix, results_filename, write_count_matrix, write_metadata,
    write_ranked_table, RESULTS_SUFFIX,
};
