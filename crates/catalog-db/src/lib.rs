//! Storage layer for the catalog service.
//!
//! Owns the single `products` table: the loader that replaces it from a CSV
//! file, the read queries the API serves from it, and the SQLite connection
//! pool both go through.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: one file shared by an offline writer (the
//!   loader) and a read-only server. WAL lets the server keep reading while a
//!   load is in progress.
//! - **`r2d2` connection pool**: each request checks a connection out and
//!   hands it back on drop, whatever path the request takes.
//! - **Schema from the data**: there are no migrations. The loader drops and
//!   recreates `products` with columns taken from the CSV header.

mod loader;
mod pool;
mod products;

pub use loader::{
    load_csv_file, load_csv_reader, verify, ColumnType, LoadError, LoadReport, LoadSummary,
};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use products::{
    count_products, get_product, list_categories, list_products, table_columns, table_exists,
    ProductError, ProductQuery, PRODUCTS_TABLE,
};
