#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use catalog_db::{create_pool, load_csv_reader, DbRuntimeSettings};
use catalog_server::{app, config::PaginationConfig, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

pub const SCENARIO_CSV: &str = "id,name,category\n1,A,X\n2,B,Y\n";

/// Builds a router over a fresh file-backed database.
///
/// When `csv` is `Some`, it is loaded first through a separate writable pool,
/// the way `catalog-load` does; the router gets a read-only pool like the
/// server binary. `None` leaves the database without a products table. The
/// returned `TempDir` must outlive the router.
pub fn test_app(csv: Option<&str>) -> (TempDir, Router) {
    test_app_with(csv, PaginationConfig::default())
}

pub fn test_app_with(csv: Option<&str>, pagination: PaginationConfig) -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("ecommerce.db");
    let path = path.to_str().unwrap();

    if let Some(csv) = csv {
        load_fixture(path, csv);
    }

    let pool = create_pool(path, DbRuntimeSettings::default().read_only())
        .expect("pool creation should succeed");
    (dir, app(AppState { pool, pagination }))
}

/// Replaces the products table at `db_path` from `csv` using a writable pool.
pub fn load_fixture(db_path: &str, csv: &str) {
    let writer = create_pool(db_path, DbRuntimeSettings::default())
        .expect("pool creation should succeed");
    let conn = writer.get().unwrap();
    load_csv_reader(&conn, csv.as_bytes()).expect("fixture csv should load");
}

/// Issues a GET and returns the status with the parsed JSON body.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("body of {uri} is not JSON ({e}): {body:?}"));
    (status, json)
}

/// A catalog of `n` products with ids 1..=n spread over three categories.
pub fn catalog_csv(n: usize) -> String {
    let mut csv = String::from("id,name,description,price,category\n");
    for i in 1..=n {
        let category = ["Kitchen", "Garden", "Office"][i % 3];
        csv.push_str(&format!(
            "{i},Product {i},\"Item number {i}, boxed\",{}.99,{category}\n",
            i * 3
        ));
    }
    csv
}
