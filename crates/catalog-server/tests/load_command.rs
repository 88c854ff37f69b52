use catalog_server::config::Config;
use catalog_server::load::{render_report, run_load, LoadCommandError};
use std::path::Path;

fn config_for(dir: &Path, csv: Option<&str>) -> Config {
    let csv_path = dir.join("products.csv");
    if let Some(csv) = csv {
        std::fs::write(&csv_path, csv).expect("failed to write csv fixture");
    }

    let mut config = Config::default();
    config.loader.csv_path = csv_path;
    config.database.path = dir.join("ecommerce.db").to_string_lossy().into_owned();
    config
}

#[test]
fn loads_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("id,name,category\n");
    for i in 1..=7 {
        csv.push_str(&format!("{i},P{i},{}\n", if i < 4 { "Low" } else { "High" }));
    }
    let config = config_for(dir.path(), Some(&csv));

    let (summary, report) = run_load(&config).expect("load should succeed");
    assert_eq!(summary.rows, 7);
    assert_eq!(report.sample.len(), 5);
    assert_eq!(report.categories, vec!["High", "Low"]);
    assert_eq!(report.total, 7);

    let text = render_report(&summary, &report);
    assert!(text.contains("First 5 rows:"));
    assert!(text.contains("Total products: 7"));
}

#[test]
fn running_twice_leaves_identical_contents() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), Some("id,name,category\n1,A,X\n2,B,Y\n"));

    let (_, first) = run_load(&config).unwrap();
    let (_, second) = run_load(&config).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.total, 2);
}

#[test]
fn missing_csv_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), None);

    let err = run_load(&config).unwrap_err();
    assert!(matches!(
        err,
        LoadCommandError::Load(catalog_db::LoadError::Io { .. })
    ));
}
