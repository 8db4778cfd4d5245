//! Inventory Ledger - warehouse stock ledger service
//!
//! Tracks how much of each product sits in each warehouse of an inventory
//! and keeps every product's aggregate stock in step with its warehouse
//! rows.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use cache::CacheClient;
use services::{StockLedger, WarehouseService};
use store::StockStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: StockLedger,
    pub warehouses: WarehouseService,
    pub store: Arc<dyn StockStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services over one store and one cache
    pub fn new(store: Arc<dyn StockStore>, cache: Arc<dyn CacheClient>, config: Config) -> Self {
        let ledger = StockLedger::new(store.clone(), cache.clone(), config.ledger.clone());
        let warehouses = WarehouseService::new(store.clone(), cache, config.cache.ttl());

        Self {
            ledger,
            warehouses,
            store,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Inventory Ledger API v1"
}
