//! Route definitions for the Inventory Ledger platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventories
        .nest("/inventories/:inventory_id", inventory_routes(state))
}

/// Warehouse, stock and product-storage routes of one inventory
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/warehouses",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route("/warehouses/transfer", post(handlers::transfer_stock))
        .route(
            "/warehouses/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        .route("/warehouses/:warehouse_id/stock", post(handlers::add_stock))
        .route(
            "/warehouses/:warehouse_id/stock/:product_id",
            put(handlers::update_stock_quantity).delete(handlers::remove_stock),
        )
        .route(
            "/products/:product_id/storages",
            get(handlers::get_product_storages),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
