//! Data access for products and their reference data.
//!
//! Handlers only see [`ProductStore`]. Production wiring uses
//! [`PgProductStore`]; [`InMemoryProductStore`] backs the router tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Product, ProductFields};

mod memory;
mod postgres;

pub use memory::InMemoryProductStore;
pub use postgres::PgProductStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("product {0} not found")]
    NotFound(i32),

    #[error("a product with sku {0} already exists")]
    DuplicateSku(String),

    #[error("{kind} {id} does not exist")]
    MissingReference { kind: &'static str, id: i32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Every product returned carries its category, brand and images ordered
/// ascending by display order. Each call is atomic on its own; callers get no
/// multi-call transactions.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, ascending by id.
    async fn list_all(&self) -> StoreResult<Vec<Product>>;

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<Product>>;

    /// Products whose category name equals `name`, ignoring case. Ascending by id.
    async fn list_by_category(&self, name: &str) -> StoreResult<Vec<Product>>;

    /// `sku` must already be normalized.
    async fn exists_by_sku(&self, sku: &str) -> StoreResult<bool>;

    /// Inserts and re-reads the product with its relations.
    async fn create(&self, fields: &ProductFields) -> StoreResult<Product>;

    /// Overwrites every field of product `id` and re-reads it.
    async fn update(&self, id: i32, fields: &ProductFields) -> StoreResult<Product>;

    /// Removes product `id`, returning it as it was just before removal.
    async fn delete(&self, id: i32) -> StoreResult<Product>;
}
