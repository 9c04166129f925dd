//! pseudobulk_de command-line interface

use std::path::Path;

use clap::Parser;
use log::{info, warn, LevelFilter};

use pseudobulk_de::cli::{Cli, Commands};
use pseudobulk_de::prelude::*;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Run {
            counts,
            annotations,
            out_dir,
            matrix_out,
            metadata_out,
            min_cells,
            zeta_quantile,
            big_count,
            threads,
        } => run_pipeline(
            &counts,
            &annotations,
            &out_dir,
            &matrix_out,
            &metadata_out,
            min_cells,
            zeta_quantile,
            big_count,
            threads,
        ),
        Commands::Aggregate {
            counts,
            annotations,
            out_dir,
            matrix_out,
            metadata_out,
            min_cells,
        } => run_aggregate(
            &counts,
            &annotations,
            &out_dir,
            &matrix_out,
            &metadata_out,
            min_cells,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load cells and annotations, aggregate, write the pseudo-sample tables
fn load_and_aggregate(
    counts_path: &str,
    annotations_path: &str,
    out_dir: &Path,
    matrix_out: &str,
    metadata_out: &str,
    min_cells: usize,
) -> Result<(CountMatrix, PseudobulkMetadata)> {
    info!("Loading cell counts from: {}", counts_path);
    let cells = read_cell_matrix(counts_path)?;
    info!("  {} genes, {} cells", cells.n_genes(), cells.n_cells());

    info!("Loading annotations from: {}", annotations_path);
    let annotations = read_cell_annotations(annotations_path)?;
    annotations.verify_alignment(&cells)?;

    info!("Aggregating into pseudo-samples...");
    let (counts, metadata) = build_pseudobulk(&cells, &annotations, min_cells)?;
    info!(
        "  {} pseudo-samples across {} cell types",
        counts.n_columns(),
        metadata.cell_types().len()
    );

    std::fs::create_dir_all(out_dir)?;

    let matrix_path = out_dir.join(matrix_out);
    info!("Writing pseudo-sample counts to: {}", matrix_path.display());
    write_count_matrix(&matrix_path, &counts)?;

    let metadata_path = out_dir.join(metadata_out);
    info!("Writing metadata to: {}", metadata_path.display());
    write_metadata(&metadata_path, &metadata)?;

    Ok((counts, metadata))
}

fn run_pipeline(
    counts_path: &str,
    annotations_path: &str,
    out_dir: &str,
    matrix_out: &str,
    metadata_out: &str,
    min_cells: usize,
    zeta_quantile: f64,
    big_count: u64,
    threads: usize,
) -> Result<()> {
    // Configure thread pool
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    let out_dir = Path::new(out_dir);
    let (counts, metadata) = load_and_aggregate(
        counts_path,
        annotations_path,
        out_dir,
        matrix_out,
        metadata_out,
        min_cells,
    )?;

    let engine = SseqEngine {
        zeta_quantile,
        big_count,
    };
    info!("Fitting shared model and extracting contrasts...");
    let (tables, mut report) = run_contrast_analysis(&counts, &metadata, &engine)?;

    // One file per cell type; a failed write loses only that cell type
    for (cell_type, table) in &tables {
        match write_ranked_table(out_dir, table) {
            Ok(path) => info!("Wrote results for '{}' to: {}", cell_type, path.display()),
            Err(e) => {
                warn!("Failed to write results for '{}': {}", cell_type, e);
                report.processed.retain(|(ct, _)| ct != cell_type);
                report.skipped.push(SkippedContrast {
                    cell_type: cell_type.clone(),
                    reason: format!("write failed: {}", e),
                });
            }
        }
    }

    println!("\n{}", report);
    Ok(())
}

fn run_aggregate(
    counts_path: &str,
    annotations_path: &str,
    out_dir: &str,
    matrix_out: &str,
    metadata_out: &str,
    min_cells: usize,
) -> Result<()> {
    load_and_aggregate(
        counts_path,
        annotations_path,
        Path::new(out_dir),
        matrix_out,
        metadata_out,
        min_cells,
    )?;
    info!("Done!");
    Ok(())
}
