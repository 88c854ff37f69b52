//! Product API handlers.

use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_db::{get_product, list_categories, list_products, ProductError, ProductQuery};
use catalog_types::{PageRequest, Product};
use serde::Deserialize;
use std::num::IntErrorKind;
use std::sync::Arc;
use thiserror::Error;

/// Body of the 404 returned for an unknown product id.
pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Query parameters for `GET /api/products`.
///
/// Kept as raw strings so a malformed number becomes a JSON 400 rather than
/// the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Page size (default from `pagination.default_limit`).
    pub limit: Option<String>,
    /// Only return products in this category.
    pub category: Option<String>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<ProductError> for ApiError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::MissingTable => ApiError::InternalServerError(
                "product catalog has not been loaded".to_string(),
            ),
            ProductError::Database(e) => {
                ApiError::InternalServerError(format!("db query failed: {}", e))
            }
        }
    }
}

/// Parses a positive integer query parameter.
///
/// Surrounding whitespace and a leading `+` are accepted; anything else that
/// is not an integer of at least 1 is rejected. Values too large for `u64`
/// saturate.
fn parse_positive(name: &str, raw: &str) -> Result<u64, ApiError> {
    let value = match raw.trim().parse::<i64>() {
        Ok(value) => value,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => return Ok(u64::MAX),
        Err(e) if *e.kind() == IntErrorKind::NegOverflow => i64::MIN,
        Err(_) => {
            return Err(ApiError::BadRequest(format!(
                "{name} must be an integer, got '{raw}'"
            )))
        }
    };
    u64::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| ApiError::BadRequest(format!("{name} must be at least 1, got {}", raw.trim())))
}

impl ListProductsQuery {
    /// Resolves the raw parameters into a listing query.
    ///
    /// `limit` is clamped to `max_limit`.
    fn into_product_query(
        self,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<ProductQuery, ApiError> {
        let page = match self.page.as_deref() {
            Some(raw) => parse_positive("page", raw)?,
            None => 1,
        };
        let limit = match self.limit.as_deref() {
            Some(raw) => parse_positive("limit", raw)?,
            None => u64::from(default_limit),
        }
        .min(u64::from(max_limit));
        let limit = u32::try_from(limit).unwrap_or(max_limit);

        let page = PageRequest::new(page, limit).map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(ProductQuery {
            page,
            category: self.category,
        })
    }
}

/// Handler for `GET /api/products`.
///
/// Returns one page of products as a JSON array. Pages past the end are an
/// empty array with `200 OK`.
pub async fn list_products_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListProductsQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let pagination = state.pagination;
    let query = params.into_product_query(pagination.default_limit, pagination.max_limit)?;

    let products = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        list_products(&conn, &query).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(products))
}

/// Handler for `GET /api/products/{id}`.
pub async fn get_product_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("product id must be an integer, got '{raw_id}'")))?;

    let product = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        get_product(&conn, id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    product
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(PRODUCT_NOT_FOUND.to_string()))
}

/// Handler for `GET /api/categories`.
pub async fn list_categories_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let categories = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        list_categories(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(categories))
}
