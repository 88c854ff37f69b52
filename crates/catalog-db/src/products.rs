//! Read queries over the `products` table.
//!
//! The table's columns are whatever the last load produced, so every query
//! selects `*` and maps rows by column name into [`Product`].

use catalog_types::{ColumnValue, PageRequest, Product, CATEGORY_COLUMN, ID_COLUMN};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

/// Name of the table the loader writes and the API reads.
pub const PRODUCTS_TABLE: &str = "products";

/// Errors that can occur while querying products.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The loader has not been run against this database yet.
    #[error("table 'products' does not exist")]
    MissingTable,
}

/// Filter and window for [`list_products`].
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub page: PageRequest,
    /// Only return products whose `category` equals this value.
    pub category: Option<String>,
}

/// Returns one page of products, ordered by `id` and then insertion order.
///
/// A page past the end is an empty vector, not an error. Filtering by
/// category on a table without a `category` column also yields nothing.
/// Both columns are found regardless of the case they were loaded with.
///
/// # Errors
///
/// Returns `ProductError::MissingTable` if the table has not been loaded,
/// or `ProductError::Database` on SQL failure.
pub fn list_products(conn: &Connection, query: &ProductQuery) -> Result<Vec<Product>, ProductError> {
    let columns = table_columns(conn)?;
    if columns.is_empty() {
        return Err(ProductError::MissingTable);
    }

    let limit = i64::from(query.page.limit());
    let offset = i64::try_from(query.page.offset()).unwrap_or(i64::MAX);
    let id_column = find_column(&columns, ID_COLUMN).unwrap_or(ID_COLUMN);

    let products = match &query.category {
        Some(category) => {
            let Some(category_column) = find_column(&columns, CATEGORY_COLUMN) else {
                return Ok(Vec::new());
            };
            let sql = format!(
                "SELECT * FROM {} WHERE {} = ?1 ORDER BY {}, rowid LIMIT ?2 OFFSET ?3",
                quote_ident(PRODUCTS_TABLE),
                quote_ident(category_column),
                quote_ident(id_column)
            );
            query_products(conn, &sql, params![category, limit, offset])?
        }
        None => {
            let sql = format!(
                "SELECT * FROM {} ORDER BY {}, rowid LIMIT ?1 OFFSET ?2",
                quote_ident(PRODUCTS_TABLE),
                quote_ident(id_column)
            );
            query_products(conn, &sql, params![limit, offset])?
        }
    };

    Ok(products)
}

/// Looks up a product by its identifier.
///
/// Identifiers are not unique at the storage level; if several rows share
/// one, the first inserted wins.
///
/// # Errors
///
/// Returns `ProductError::MissingTable` if the table has not been loaded,
/// or `ProductError::Database` on SQL failure.
pub fn get_product(conn: &Connection, id: i64) -> Result<Option<Product>, ProductError> {
    if !table_exists(conn)? {
        return Err(ProductError::MissingTable);
    }

    let sql = format!(
        "SELECT * FROM {} WHERE {} = ?1 ORDER BY rowid LIMIT 1",
        quote_ident(PRODUCTS_TABLE),
        quote_ident(ID_COLUMN)
    );
    let mut stmt = conn.prepare(&sql)?;
    let columns = column_names(&stmt);

    let product = stmt
        .query_row([id], |row| map_row_to_product(row, &columns))
        .optional()?;
    Ok(product)
}

/// Returns the distinct, non-null categories in ascending order.
///
/// # Errors
///
/// Returns `ProductError::MissingTable` if the table has not been loaded,
/// or `ProductError::Database` on SQL failure.
pub fn list_categories(conn: &Connection) -> Result<Vec<String>, ProductError> {
    let columns = table_columns(conn)?;
    if columns.is_empty() {
        return Err(ProductError::MissingTable);
    }
    let Some(category_column) = find_column(&columns, CATEGORY_COLUMN) else {
        return Ok(Vec::new());
    };

    let sql = format!(
        "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL ORDER BY {col}",
        col = quote_ident(category_column),
        table = quote_ident(PRODUCTS_TABLE)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(column_value(row.get_ref(0)?).into_text()))?;

    let mut categories = Vec::new();
    for row in rows {
        if let Some(category) = row? {
            categories.push(category);
        }
    }
    Ok(categories)
}

/// Returns the number of rows in the table.
///
/// # Errors
///
/// Returns `ProductError::Database` on SQL failure, including a missing table.
pub fn count_products(conn: &Connection) -> Result<i64, ProductError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(PRODUCTS_TABLE));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Returns the column names of the table in declaration order.
///
/// An empty result means the table does not exist.
///
/// # Errors
///
/// Returns `ProductError::Database` on SQL failure.
pub fn table_columns(conn: &Connection) -> Result<Vec<String>, ProductError> {
    let sql = format!("PRAGMA table_info({})", quote_ident(PRODUCTS_TABLE));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// Returns whether the `products` table exists.
///
/// # Errors
///
/// Returns `ProductError::Database` on SQL failure.
pub fn table_exists(conn: &Connection) -> Result<bool, ProductError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [PRODUCTS_TABLE],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Returns the stored spelling of `name` among `columns`, ignoring ASCII case
/// the way SQLite resolves column names.
pub(crate) fn find_column<'a>(columns: &'a [String], name: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(name))
        .map(String::as_str)
}

/// Quotes an SQL identifier, doubling any embedded quote characters.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn query_products<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Product>, ProductError> {
    let mut stmt = conn.prepare(sql)?;
    let columns = column_names(&stmt);

    let rows = stmt.query_map(params, |row| map_row_to_product(row, &columns))?;
    let mut products = Vec::new();
    for row in rows {
        products.push(row?);
    }
    Ok(products)
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(str::to_string).collect()
}

fn column_value(value: ValueRef<'_>) -> ColumnValue {
    match value {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(n) => ColumnValue::Integer(n),
        ValueRef::Real(f) => ColumnValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            ColumnValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn map_row_to_product(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Product> {
    let mut cells = Vec::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        cells.push((name.as_str(), column_value(row.get_ref(idx)?)));
    }

    Product::from_columns(cells).map_err(|e| {
        let idx = columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(ID_COLUMN))
            .unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e))
    })
}
