//! Catalog server library logic.
//!
//! Holds the router factory and handlers for the read-only product API, the
//! configuration shared by both binaries, and the CSV load command behind
//! `catalog-load`.

pub mod api;
pub mod config;
pub mod load;

use axum::{http::Method, routing::get, Extension, Json, Router};
use catalog_db::DbPool;
use config::{LoggingConfig, PaginationConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Listing defaults and limits.
    pub pagination: PaginationConfig,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Index handler listing the available endpoints.
async fn index() -> Json<Value> {
    Json(json!({
        "message": "Catalog API",
        "endpoints": {
            "products": "/api/products",
            "product": "/api/products/{id}",
            "categories": "/api/categories",
            "health": "/health"
        }
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/products", get(api::list_products_handler))
        .route("/api/products/{id}", get(api::get_product_handler))
        .route("/api/categories", get(api::list_categories_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

/// Installs the global tracing subscriber.
///
/// An unparsable `level` falls back to `info`.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
