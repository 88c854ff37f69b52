//! Shared types for the catalog service.
//!
//! The `products` table has no fixed schema: its columns come from the header
//! of whatever CSV file the loader ingested. This crate defines the explicit
//! [`Product`] record that every stored row is mapped into, along with the
//! pagination window used by the listing endpoint.
//!
//! Both `catalog-db` and `catalog-server` depend on this crate; it depends on
//! nothing internal.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Name of the identifier column every product row carries.
///
/// Column names are matched ASCII-case-insensitively, as SQLite does, so a
/// stored `ID` column is the same column.
pub const ID_COLUMN: &str = "id";

/// Name of the column used for category grouping and filtering.
pub const CATEGORY_COLUMN: &str = "category";

/// Errors raised while mapping a storage row into a [`Product`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// The row has no `id` column, or it is NULL.
    #[error("row is missing an id")]
    MissingId,

    /// The `id` column holds a value that is not an integer.
    #[error("id is not an integer: {0}")]
    InvalidId(String),
}

/// A single cell read from the `products` table.
///
/// Mirrors the SQLite storage classes the loader writes. Blobs are never
/// produced by the loader and are not represented.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ColumnValue {
    /// Renders the cell as text, the way it would appear in the source file.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(n) => Some(n.to_string()),
            Self::Real(f) => Some(f.to_string()),
            Self::Text(s) => Some(s),
        }
    }

    /// Converts the cell to a JSON value, keeping its storage class.
    pub fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(n) => Value::from(n),
            Self::Real(f) => Value::from(f),
            Self::Text(s) => Value::String(s),
        }
    }
}

/// A catalog product.
///
/// The commonly present columns are typed fields; every other column of the
/// stored row lands in [`Product::attributes`] and is serialized inline, so
/// the JSON object carries every stored column that holds a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Lookup key for `GET /api/products/{id}`.
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Unit price. Only populated when the stored value is numeric; a textual
    /// price is kept verbatim in `attributes` instead. Integer prices stay
    /// integers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Number>,
    /// Remaining columns, keyed by column name.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Product {
    /// Maps a stored row, given as `(column name, cell)` pairs, into a product.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] if the row has no usable integer `id`.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (S, ColumnValue)>,
        S: Into<String>,
    {
        let mut id = None;
        let mut product = Product {
            id: 0,
            name: None,
            description: None,
            category: None,
            price: None,
            attributes: BTreeMap::new(),
        };

        for (column, value) in columns {
            let column = column.into();
            match column.to_ascii_lowercase().as_str() {
                ID_COLUMN => id = Some(parse_id(value)?),
                "name" => product.name = value.into_text(),
                "description" => product.description = value.into_text(),
                CATEGORY_COLUMN => product.category = value.into_text(),
                "price" => match parse_price(value) {
                    Ok(price) => product.price = price,
                    Err(raw) => {
                        product.attributes.insert(column, raw);
                    }
                },
                _ => {
                    if value != ColumnValue::Null {
                        product.attributes.insert(column, value.into_json());
                    }
                }
            }
        }

        product.id = id.ok_or(MappingError::MissingId)?;
        Ok(product)
    }
}

fn parse_id(value: ColumnValue) -> Result<i64, MappingError> {
    match value {
        ColumnValue::Null => Err(MappingError::MissingId),
        ColumnValue::Integer(n) => Ok(n),
        ColumnValue::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        ColumnValue::Real(f) => Err(MappingError::InvalidId(f.to_string())),
        ColumnValue::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| MappingError::InvalidId(s)),
    }
}

/// Numeric prices become a JSON number of the same kind; anything else is
/// handed back as the raw value to keep.
fn parse_price(value: ColumnValue) -> Result<Option<Number>, Value> {
    match value {
        ColumnValue::Null => Ok(None),
        ColumnValue::Integer(n) => Ok(Some(Number::from(n))),
        ColumnValue::Real(f) => Number::from_f64(f).map(Some).ok_or(Value::from(f)),
        ColumnValue::Text(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Some(Number::from(n)));
            }
            match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Ok(Some(n)),
                None => Err(Value::String(s)),
            }
        }
    }
}

/// Errors raised when building a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page must be at least 1")]
    PageOutOfRange,
    #[error("limit must be at least 1")]
    LimitOutOfRange,
}

/// A `page`/`limit` window over the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u32,
}

impl PageRequest {
    /// Creates a window. Pages are 1-based.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if `page` or `limit` is zero.
    pub fn new(page: u64, limit: u32) -> Result<Self, PageError> {
        if page == 0 {
            return Err(PageError::PageOutOfRange);
        }
        if limit == 0 {
            return Err(PageError::LimitOutOfRange);
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows skipped before this page: `(page - 1) * limit`,
    /// saturating at `u64::MAX`.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(u64::from(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> ColumnValue {
        ColumnValue::Text(s.to_string())
    }

    #[test]
    fn maps_known_columns_to_typed_fields() {
        let product = Product::from_columns([
            ("id", ColumnValue::Integer(1)),
            ("name", text("A")),
            ("category", text("X")),
            ("price", ColumnValue::Real(9.5)),
        ])
        .expect("row should map");

        assert_eq!(product.id, 1);
        assert_eq!(product.name.as_deref(), Some("A"));
        assert_eq!(product.category.as_deref(), Some("X"));
        assert_eq!(product.price, Number::from_f64(9.5));
        assert!(product.attributes.is_empty());
    }

    #[test]
    fn serializes_only_stored_columns() {
        let product = Product::from_columns([
            ("id", ColumnValue::Integer(1)),
            ("name", text("A")),
            ("category", text("X")),
        ])
        .unwrap();

        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value, json!({"id": 1, "name": "A", "category": "X"}));
    }

    #[test]
    fn unknown_columns_are_flattened() {
        let product = Product::from_columns([
            ("id", ColumnValue::Integer(7)),
            ("stock", ColumnValue::Integer(12)),
            ("image_url", text("http://img/7.png")),
            ("discontinued", ColumnValue::Null),
        ])
        .unwrap();

        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(
            value,
            json!({"id": 7, "stock": 12, "image_url": "http://img/7.png"})
        );
    }

    #[test]
    fn textual_price_is_kept_verbatim() {
        let product = Product::from_columns([
            ("id", ColumnValue::Integer(3)),
            ("price", text("call us")),
        ])
        .unwrap();

        assert_eq!(product.price, None);
        assert_eq!(product.attributes["price"], json!("call us"));

        let numeric = Product::from_columns([
            ("id", ColumnValue::Integer(4)),
            ("price", text(" 12.25 ")),
        ])
        .unwrap();
        assert_eq!(numeric.price, Number::from_f64(12.25));
    }

    #[test]
    fn integer_price_stays_an_integer() {
        let product = Product::from_columns([
            ("id", ColumnValue::Integer(1)),
            ("name", text("A")),
            ("price", ColumnValue::Integer(5)),
        ])
        .unwrap();
        assert_eq!(
            serde_json::to_value(&product).unwrap(),
            json!({"id": 1, "name": "A", "price": 5})
        );

        let big = Product::from_columns([
            ("id", ColumnValue::Integer(2)),
            ("price", ColumnValue::Integer(9_007_199_254_740_993)),
        ])
        .unwrap();
        assert_eq!(big.price, Some(Number::from(9_007_199_254_740_993_i64)));

        let textual = Product::from_columns([
            ("id", ColumnValue::Integer(3)),
            ("price", text("7")),
        ])
        .unwrap();
        assert_eq!(serde_json::to_value(&textual).unwrap()["price"], json!(7));
    }

    #[test]
    fn column_names_match_case_insensitively() {
        let product = Product::from_columns([
            ("ID", ColumnValue::Integer(4)),
            ("Name", text("Lamp")),
            ("Category", text("Home")),
            ("PRICE", ColumnValue::Real(2.5)),
            ("Stock", ColumnValue::Integer(3)),
        ])
        .unwrap();

        assert_eq!(product.id, 4);
        assert_eq!(product.name.as_deref(), Some("Lamp"));
        assert_eq!(product.category.as_deref(), Some("Home"));
        assert_eq!(product.price, Number::from_f64(2.5));
        assert_eq!(product.attributes["Stock"], json!(3));
    }

    #[test]
    fn numeric_name_is_rendered_as_text() {
        let product = Product::from_columns([
            ("id", ColumnValue::Integer(1)),
            ("name", ColumnValue::Integer(1984)),
        ])
        .unwrap();
        assert_eq!(product.name.as_deref(), Some("1984"));
    }

    #[test]
    fn id_is_required() {
        let err = Product::from_columns([("name", text("A"))]).unwrap_err();
        assert_eq!(err, MappingError::MissingId);

        let err = Product::from_columns([("id", ColumnValue::Null)]).unwrap_err();
        assert_eq!(err, MappingError::MissingId);

        let err = Product::from_columns([("id", text("abc"))]).unwrap_err();
        assert_eq!(err, MappingError::InvalidId("abc".to_string()));
    }

    #[test]
    fn id_accepts_integral_reals_and_text() {
        let product = Product::from_columns([("id", ColumnValue::Real(5.0))]).unwrap();
        assert_eq!(product.id, 5);

        let product = Product::from_columns([("id", text("42"))]).unwrap();
        assert_eq!(product.id, 42);

        let err = Product::from_columns([("id", ColumnValue::Real(1.5))]).unwrap_err();
        assert!(matches!(err, MappingError::InvalidId(_)));
    }

    #[test]
    fn deserializes_from_api_json() {
        let product: Product = serde_json::from_value(json!({
            "id": 2,
            "name": "B",
            "category": "Y",
            "color": "red"
        }))
        .unwrap();

        assert_eq!(product.id, 2);
        assert_eq!(product.category.as_deref(), Some("Y"));
        assert_eq!(product.attributes["color"], json!("red"));
    }

    #[test]
    fn page_offsets() {
        assert_eq!(PageRequest::new(1, 10).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 10).unwrap().offset(), 20);
        assert_eq!(PageRequest::new(2, 1).unwrap().offset(), 1);
        assert_eq!(
            PageRequest::new(5_000_000_000, 10).unwrap().offset(),
            49_999_999_990
        );
        assert_eq!(PageRequest::new(u64::MAX, u32::MAX).unwrap().offset(), u64::MAX);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn page_rejects_zero() {
        assert_eq!(PageRequest::new(0, 10), Err(PageError::PageOutOfRange));
        assert_eq!(PageRequest::new(1, 0), Err(PageError::LimitOutOfRange));
    }
}
