//! JM Products API
//!
//! CRUD over products (with their category, brand and images) backed by
//! PostgreSQL. Every response body is rendered from a fixed
//! route/method/status table; see [`responses`].
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome
//! - `GET /products` - List all products
//! - `POST /products` - Create a product
//! - `GET /products/:id` - Get one product
//! - `PUT /products/:id` - Replace a product
//! - `DELETE /products/:id` - Delete a product
//! - `GET /category/:name` - List products of a category (case-insensitive)
//! - `GET /health` - Health check

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod responses;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::ProductStore;
use crate::responses::{ResponseTable, RouteKey};

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProductStore>,
    /// Built once at startup and never mutated.
    pub responses: Arc<ResponseTable>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProductStore>, responses: ResponseTable) -> Self {
        Self {
            store,
            responses: Arc::new(responses),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            RouteKey::Root.pattern(),
            get(handlers::root).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health))
        .route(
            RouteKey::Products.pattern(),
            get(handlers::products::list_products)
                .post(handlers::products::create_product)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            RouteKey::ProductById.pattern(),
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            RouteKey::ProductsByCategory.pattern(),
            get(handlers::products::list_products_by_category)
                .fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
