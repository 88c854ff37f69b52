//! Catalog server binary.
//!
//! Serves the read-only product API over the database written by
//! `catalog-load`, with graceful shutdown on SIGTERM/SIGINT.

use catalog_server::{app, config, init_tracing, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let (config_path, config_source) = config::resolve_config_path();

    let config = config::load_config(Some(&config_path))
        .expect("failed to load configuration — the server cannot start without valid config");

    init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    // The API never writes; catalog-load opens its own writable pool.
    let settings = config.database.runtime_settings().read_only();
    let pool = catalog_db::create_pool(&config.database.path, settings)
        .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for startup check");
        match catalog_db::table_exists(&conn) {
            Ok(true) => {
                if let Ok(count) = catalog_db::count_products(&conn) {
                    tracing::info!(count, "product catalog ready");
                }
            }
            Ok(false) => tracing::warn!(
                path = %config.database.path,
                "products table not found; run catalog-load first"
            ),
            Err(e) => tracing::warn!("failed to inspect database: {}", e),
        }
    }

    let state = AppState {
        pool,
        pagination: config.pagination,
    };
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting catalog server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("catalog server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
