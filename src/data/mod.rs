//! Data structures for the pseudobulk pipeline

mod annotations;
mod cell_matrix;
mod count_matrix;
mod metadata;

pub use annotations::{CellAnnotations, CellRecord};
pub use cell_matrix::CellMatrix;
pub use count_matrix::CountMatrix;
pub use metadata::{PseudobulkMetadata, SampleRecord};
