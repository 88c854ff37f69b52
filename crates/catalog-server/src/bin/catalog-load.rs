//! Loader binary: replaces the `products` table from a CSV file and prints
//! a short verification report.

use catalog_server::{config, init_tracing, load};
use std::process::ExitCode;

fn main() -> ExitCode {
    let (config_path, config_source) = config::resolve_config_path();

    let config = match config::load_config(Some(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("catalog-load: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = %config_path,
        csv = %config.loader.csv_path.display(),
        db = %config.database.path,
        "starting load"
    );

    match load::run_load(&config) {
        Ok((summary, report)) => {
            print!("{}", load::render_report(&summary, &report));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "load failed");
            ExitCode::FAILURE
        }
    }
}
