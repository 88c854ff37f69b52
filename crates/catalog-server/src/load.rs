//! The `catalog-load` command: replace the products table from a CSV file
//! and report what was loaded.

use crate::config::Config;
use catalog_db::{create_pool, load_csv_file, verify, LoadError, LoadReport, LoadSummary};
use catalog_db::{PoolError, ProductError};
use std::fmt::Write;
use thiserror::Error;

/// Errors that abort a load.
#[derive(Debug, Error)]
pub enum LoadCommandError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("db connection failed: {0}")]
    Connection(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("post-load verification failed: {0}")]
    Verify(#[from] ProductError),
}

/// Loads `loader.csv_path` into the database at `database.path` and reads
/// back the verification report.
///
/// The connection is returned to the pool, and the pool closed, before this
/// function returns.
///
/// # Errors
///
/// Returns `LoadCommandError` if the database cannot be opened, the file
/// cannot be loaded, or the table cannot be read back.
pub fn run_load(config: &Config) -> Result<(LoadSummary, LoadReport), LoadCommandError> {
    let mut settings = config.database.runtime_settings();
    settings.pool_max_size = 1;

    let pool = create_pool(&config.database.path, settings)?;
    let conn = pool
        .get()
        .map_err(|e| LoadCommandError::Connection(e.to_string()))?;

    let summary = load_csv_file(&conn, &config.loader.csv_path)?;
    let report = verify(&conn, config.loader.sample_rows)?;

    tracing::info!(
        db = %config.database.path,
        rows = summary.rows,
        total = report.total,
        "load complete"
    );

    Ok((summary, report))
}

/// Formats the post-load report printed to stdout.
pub fn render_report(summary: &LoadSummary, report: &LoadReport) -> String {
    let mut out = String::new();

    let columns: Vec<String> = summary
        .columns
        .iter()
        .map(|(name, ty)| format!("{name} {}", ty.as_sql()))
        .collect();
    let _ = writeln!(out, "Loaded {} rows", summary.rows);
    let _ = writeln!(out, "Columns: {}", columns.join(", "));
    if summary.generated_ids {
        let _ = writeln!(out, "No id column in input; ids assigned from row order");
    }

    let _ = writeln!(out, "First {} rows:", report.sample.len());
    for product in &report.sample {
        let line = serde_json::to_string(product).unwrap_or_else(|_| format!("{product:?}"));
        let _ = writeln!(out, "  {line}");
    }

    let _ = writeln!(out, "Categories: [{}]", report.categories.join(", "));
    let _ = writeln!(out, "Total products: {}", report.total);
    out
}
