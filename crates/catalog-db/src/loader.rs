//! CSV ingestion into the `products` table.
//!
//! A load replaces the table wholesale: the old table is dropped, a new one is
//! created with one column per CSV header field, and every record is inserted.
//! All of it happens in one transaction, so readers see either the previous
//! contents or the new ones.
//!
//! Column types are inferred from the data. A column whose non-empty cells all
//! parse as integers is `INTEGER`, one whose cells all parse as finite numbers
//! is `REAL`, anything else is `TEXT`. Empty cells are stored as `NULL`.

use crate::products::{
    count_products, list_categories, query_products, quote_ident, ProductError, PRODUCTS_TABLE,
};
use catalog_types::{Product, ID_COLUMN};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a CSV file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file could not be opened.
    #[error("failed to open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input is not well-formed CSV (e.g. ragged rows, bad UTF-8).
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    /// The header row is missing, or has blank or repeated names.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A value in the `id` column is empty or not an integer.
    #[error("line {line}: id '{value}' is not an integer")]
    InvalidId { line: u64, value: String },

    /// Writing to the database failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Storage type chosen for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Returns the SQLite type name used in `CREATE TABLE`.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    fn of_cell(cell: &str) -> Self {
        if cell.parse::<i64>().is_ok() {
            Self::Integer
        } else if cell.parse::<f64>().is_ok_and(f64::is_finite) {
            Self::Real
        } else {
            Self::Text
        }
    }

    fn convert(self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match self {
            Self::Integer => cell
                .parse()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            Self::Real => cell
                .parse()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            Self::Text => Value::Text(cell.to_string()),
        }
    }
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Number of rows written.
    pub rows: usize,
    /// Columns of the new table, in order, with their inferred types.
    pub columns: Vec<(String, ColumnType)>,
    /// Whether the file had no `id` column and row numbers were assigned.
    pub generated_ids: bool,
}

/// Post-load diagnostics printed by the loader binary.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The first rows of the table, in file order.
    pub sample: Vec<Product>,
    /// Distinct non-null categories.
    pub categories: Vec<String>,
    /// Total number of rows.
    pub total: i64,
}

/// Loads the CSV file at `path` into the `products` table, replacing it.
///
/// # Errors
///
/// Returns `LoadError::Io` if the file cannot be opened, and otherwise the
/// errors of [`load_csv_reader`].
pub fn load_csv_file(conn: &Connection, path: &Path) -> Result<LoadSummary, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "loading products from csv");
    load_csv_reader(conn, file)
}

/// Loads CSV data from `reader` into the `products` table, replacing it.
///
/// The whole input is parsed and validated before the table is touched.
///
/// # Errors
///
/// Returns `LoadError::Csv` for malformed input, `LoadError::InvalidHeader`
/// or `LoadError::InvalidId` for unusable data, and `LoadError::Database` if
/// the table cannot be replaced. On any error the previous table is kept.
pub fn load_csv_reader<R: Read>(conn: &Connection, reader: R) -> Result<LoadSummary, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    validate_headers(&headers)?;

    let records = csv_reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, _>>()?;

    let id_index = headers.iter().position(|h| h.eq_ignore_ascii_case(ID_COLUMN));
    let mut types = infer_column_types(&headers, &records);

    if let Some(idx) = id_index {
        for record in &records {
            let cell = record.get(idx).unwrap_or_default();
            if cell.parse::<i64>().is_err() {
                return Err(LoadError::InvalidId {
                    line: record.position().map_or(0, |p| p.line()),
                    value: cell.to_string(),
                });
            }
        }
        types[idx] = ColumnType::Integer;
    }

    let mut column_defs = Vec::with_capacity(headers.len() + 1);
    if id_index.is_none() {
        column_defs.push(format!("{} INTEGER PRIMARY KEY", quote_ident(ID_COLUMN)));
    }
    for (name, ty) in headers.iter().zip(&types) {
        column_defs.push(format!("{} {}", quote_ident(name), ty.as_sql()));
    }

    let table = quote_ident(PRODUCTS_TABLE);
    let width = column_defs.len();
    let placeholders = (1..=width)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} ({});",
        column_defs.join(", ")
    ))?;

    {
        let mut stmt = tx.prepare(&format!("INSERT INTO {table} VALUES ({placeholders})"))?;
        for (n, record) in records.iter().enumerate() {
            let mut values = Vec::with_capacity(width);
            if id_index.is_none() {
                values.push(Value::Integer(n as i64 + 1));
            }
            for (cell, ty) in record.iter().zip(&types) {
                values.push(ty.convert(cell));
            }
            stmt.execute(params_from_iter(values))?;
        }
    }

    tx.commit()?;

    let mut columns = Vec::with_capacity(width);
    if id_index.is_none() {
        columns.push((ID_COLUMN.to_string(), ColumnType::Integer));
    }
    columns.extend(headers.into_iter().zip(types));

    tracing::info!(
        rows = records.len(),
        columns = columns.len(),
        generated_ids = id_index.is_none(),
        "replaced products table"
    );

    Ok(LoadSummary {
        rows: records.len(),
        columns,
        generated_ids: id_index.is_none(),
    })
}

/// Collects the post-load diagnostics: the first `sample_rows` rows, the
/// distinct categories and the total row count.
///
/// # Errors
///
/// Returns `ProductError` if the table is missing or cannot be read.
pub fn verify(conn: &Connection, sample_rows: u32) -> Result<LoadReport, ProductError> {
    let sql = format!(
        "SELECT * FROM {} ORDER BY rowid LIMIT ?1",
        quote_ident(PRODUCTS_TABLE)
    );
    let sample = query_products(conn, &sql, [i64::from(sample_rows)])?;
    let categories = list_categories(conn)?;
    let total = count_products(conn)?;

    Ok(LoadReport {
        sample,
        categories,
        total,
    })
}

fn validate_headers(headers: &[String]) -> Result<(), LoadError> {
    if headers.is_empty() {
        return Err(LoadError::InvalidHeader("file has no header row".to_string()));
    }

    let mut seen = HashSet::new();
    for (idx, name) in headers.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(LoadError::InvalidHeader(format!(
                "column {} has an empty name",
                idx + 1
            )));
        }
        // SQLite column names are case-insensitive.
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(LoadError::InvalidHeader(format!(
                "column '{name}' appears more than once"
            )));
        }
    }
    Ok(())
}

fn infer_column_types(headers: &[String], records: &[csv::StringRecord]) -> Vec<ColumnType> {
    let mut inferred: Vec<Option<ColumnType>> = vec![None; headers.len()];
    for record in records {
        for (slot, cell) in inferred.iter_mut().zip(record.iter()) {
            if cell.is_empty() {
                continue;
            }
            let ty = ColumnType::of_cell(cell);
            *slot = Some(slot.map_or(ty, |current| current.max(ty)));
        }
    }

    // A column with no values at all is stored as text.
    inferred
        .into_iter()
        .map(|ty| ty.unwrap_or(ColumnType::Text))
        .collect()
}
