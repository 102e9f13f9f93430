mod catalogue;
mod config;
mod db;
mod engine;
mod errors;
mod ledger;
mod odds;
mod quotes;
mod server;
mod state;
#[cfg(test)]
mod testkit;

use crate::catalogue::MarketCatalogue;
use crate::ledger::SqliteLedger;
use crate::quotes::SqliteQuoteStore;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("futures_ev starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Catalogue: file override or the built-in NBA futures set
    let catalogue = match &cfg.catalogue_path {
        Some(path) => MarketCatalogue::load(path, cfg.default_vig),
        None => MarketCatalogue::nba_futures(cfg.default_vig),
    };
    let catalogue = match catalogue {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("catalogue error: {e}");
            std::process::exit(1);
        }
    };

    // External stores, read-only
    let ledger_db = match db::open_read_only(&cfg.ledger_db_path) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("ledger open error: {e}");
            std::process::exit(1);
        }
    };
    let quotes_db = match db::open_read_only(&cfg.quotes_db_path) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("quote store open error: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(
        cfg.clone(),
        catalogue,
        SqliteLedger::new(ledger_db),
        SqliteQuoteStore::new(quotes_db),
    );

    if cfg.run_once {
        run_once(app_state).await;
        return;
    }

    let port = cfg.server_port;
    let app = axum::Router::new()
        .route("/api/ev", axum::routing::get(server::routes::get_ev))
        .route("/api/markets", axum::routing::get(server::routes::get_markets))
        .route("/api/principal", axum::routing::get(server::routes::get_principal))
        .route("/api/positions", axum::routing::get(server::routes::get_positions))
        .route("/api/counters", axum::routing::get(server::routes::get_counters))
        .route("/health", axum::routing::get(server::routes::health))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(app_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

/// Compute one table as of now, print it to stdout as JSON, exit non-zero on
/// failure.
async fn run_once(state: std::sync::Arc<AppState>) {
    let table = match tokio::task::spawn_blocking(move || state.run_ev(None, None)).await {
        Ok(Ok(table)) => table,
        Ok(Err(e)) => {
            tracing::error!("ev run failed: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("ev task failed: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&table) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("serialize error: {e}");
            std::process::exit(1);
        }
    }
}
