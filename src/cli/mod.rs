//! Command-line interface for pseudobulk_de

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pseudobulk_de")]
#[command(version)]
#[command(about = "Cluster-wise pseudobulk differential expression for single-cell RNA-seq counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pseudobulk pipeline
    #[command(
        about = "Run the full pseudobulk pipeline",
        long_about = "Run the full pseudobulk pipeline\n\n\
            Aggregates per-cell counts into one pseudo-sample per (cell type,\n\
            sample) pair, derives the sample-level metadata table, fits the\n\
            shared negative-binomial model, and writes one ranked STIM vs CTRL\n\
            result table per cell type. A cell type observed under only one\n\
            condition is skipped and reported, not fatal.",
        after_long_help = "\
Examples:
  # Full run into ./results
  pseudobulk_de run -c counts.csv -a annotations.csv -o results

  # Flag pseudo-samples built from fewer than 30 cells
  pseudobulk_de run -c counts.csv -a annotations.csv -o results --min-cells 30

  # Pin the rayon pool to 4 workers
  pseudobulk_de run -c counts.csv -a annotations.csv -o results -t 4"
    )]
    Run {
        /// Path to per-cell count matrix CSV file
        #[arg(short, long,
            long_help = "Path to the per-cell count matrix.\n\
                Format: first column = gene IDs, remaining columns = raw counts per cell.\n\
                Supports both CSV (comma) and TSV (tab) delimiters (auto-detected).")]
        counts: String,

        /// Path to per-cell annotation CSV file
        #[arg(short, long,
            long_help = "Path to the per-cell annotation table.\n\
                Columns: cell_id (matching count matrix columns), cell_type,\n\
                sample (e.g. CTRL_101), condition (CTRL or STIM).")]
        annotations: String,

        /// Output directory [default: .]
        #[arg(short, long, default_value = ".")]
        out_dir: String,

        /// Pseudo-sample count matrix filename [default: pseudobulk_counts.tsv]
        #[arg(long, default_value = "pseudobulk_counts.tsv")]
        matrix_out: String,

        /// Pseudo-sample metadata filename [default: pseudobulk_metadata.csv]
        #[arg(long, default_value = "pseudobulk_metadata.csv")]
        metadata_out: String,

        /// Minimum cells per pseudo-sample before a warning is logged [default: 10]
        #[arg(long, default_value = "10",
            long_help = "Minimum number of cells per pseudo-sample.\n\
                Smaller partitions are kept but flagged in the log; pseudobulk\n\
                estimates from a handful of cells are noisy.")]
        min_cells: usize,

        /// Dispersion shrinkage target quantile [default: 0.995]
        #[arg(long, default_value = "0.995",
            long_help = "Quantile of the method-of-moments dispersions used as\n\
                shrinkage target for the shared negative-binomial fit.")]
        zeta_quantile: f64,

        /// Pooled-count threshold for the asymptotic test [default: 900]
        #[arg(long, default_value = "900",
            long_help = "When both groups' pooled counts exceed this threshold,\n\
                the beta approximation replaces the exact test.")]
        big_count: u64,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,
    },

    /// Aggregate counts and write the pseudo-sample tables only
    #[command(
        long_about = "Aggregate per-cell counts into pseudo-samples.\n\n\
            Writes the pseudo-sample count matrix and metadata table without\n\
            running any contrasts; useful for inspecting the aggregation before\n\
            committing to a differential-expression run.",
        after_long_help = "\
Examples:
  pseudobulk_de aggregate -c counts.csv -a annotations.csv -o inspect"
    )]
    Aggregate {
        /// Path to per-cell count matrix CSV file
        #[arg(short, long)]
        counts: String,

        /// Path to per-cell annotation CSV file
        #[arg(short, long)]
        annotations: String,

        /// Output directory [default: .]
        #[arg(short, long, default_value = ".")]
        out_dir: String,

        /// Pseudo-sample count matrix filename [default: pseudobulk_counts.tsv]
        #[arg(long, default_value = "pseudobulk_counts.tsv")]
        matrix_out: String,

        /// Pseudo-sample metadata filename [default: pseudobulk_metadata.csv]
        #[arg(long, default_value = "pseudobulk_metadata.csv")]
        metadata_out: String,

        /// Minimum cells per pseudo-sample before a warning is logged [default: 10]
        #[arg(long, default_value = "10")]
        min_cells: usize,
    },
}
