use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProductStore, StoreError, StoreResult};
use crate::models::{sort_images, Brand, Category, Product, ProductFields, ProductImage};

#[derive(Debug, Default)]
struct State {
    categories: BTreeMap<i32, Category>,
    brands: BTreeMap<i32, Brand>,
    /// Keyed by id so iteration is ascending by id.
    products: BTreeMap<i32, ProductFields>,
    images: Vec<ProductImage>,
    next_product_id: i32,
    next_image_id: i32,
}

impl State {
    fn resolve(&self, id: i32) -> Option<Product> {
        let fields = self.products.get(&id)?;
        let category = self.categories.get(&fields.category_id)?.clone();
        let brand = self.brands.get(&fields.brand_id)?.clone();

        let mut images: Vec<ProductImage> = self
            .images
            .iter()
            .filter(|i| i.product_id == id)
            .cloned()
            .collect();
        sort_images(&mut images);

        Some(Product {
            id,
            sku: fields.sku.clone(),
            name: fields.name.clone(),
            description: fields.description.clone(),
            price: fields.price,
            stock: fields.stock,
            category_id: fields.category_id,
            brand_id: fields.brand_id,
            category,
            brand,
            images,
        })
    }

    fn check_references(&self, fields: &ProductFields) -> StoreResult<()> {
        if !self.categories.contains_key(&fields.category_id) {
            return Err(StoreError::MissingReference {
                kind: "category",
                id: fields.category_id,
            });
        }
        if !self.brands.contains_key(&fields.brand_id) {
            return Err(StoreError::MissingReference {
                kind: "brand",
                id: fields.brand_id,
            });
        }
        Ok(())
    }

    fn sku_taken(&self, sku: &str, except: Option<i32>) -> bool {
        self.products
            .iter()
            .any(|(id, fields)| fields.sku == sku && Some(*id) != except)
    }
}

/// Store kept entirely in process memory, with the same ordering and
/// uniqueness rules as the PostgreSQL schema.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    state: RwLock<State>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, id: i32, name: impl Into<String>) -> Self {
        let name = name.into();
        self.state.get_mut().categories.insert(id, Category { id, name });
        self
    }

    pub fn with_brand(mut self, id: i32, name: impl Into<String>) -> Self {
        let name = name.into();
        self.state.get_mut().brands.insert(id, Brand { id, name });
        self
    }

    /// Attaches an image to an existing product.
    pub async fn add_image(
        &self,
        product_id: i32,
        display_order: i32,
        image_url: impl Into<String>,
    ) -> StoreResult<ProductImage> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::NotFound(product_id));
        }

        state.next_image_id += 1;
        let image = ProductImage {
            id: state.next_image_id,
            product_id,
            display_order,
            image_url: image_url.into(),
        };
        state.images.push(image.clone());
        Ok(image)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.products.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn list_all(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .keys()
            .filter_map(|id| state.resolve(*id))
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<Product>> {
        Ok(self.state.read().await.resolve(id))
    }

    async fn list_by_category(&self, name: &str) -> StoreResult<Vec<Product>> {
        let wanted = name.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .products
            .keys()
            .filter_map(|id| state.resolve(*id))
            .filter(|p| p.category.name.to_lowercase() == wanted)
            .collect())
    }

    async fn exists_by_sku(&self, sku: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.sku_taken(sku, None))
    }

    async fn create(&self, fields: &ProductFields) -> StoreResult<Product> {
        let mut state = self.state.write().await;
        if state.sku_taken(&fields.sku, None) {
            return Err(StoreError::DuplicateSku(fields.sku.clone()));
        }
        state.check_references(fields)?;

        state.next_product_id += 1;
        let id = state.next_product_id;
        state.products.insert(id, fields.clone());

        state.resolve(id).ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i32, fields: &ProductFields) -> StoreResult<Product> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if state.sku_taken(&fields.sku, Some(id)) {
            return Err(StoreError::DuplicateSku(fields.sku.clone()));
        }
        state.check_references(fields)?;

        state.products.insert(id, fields.clone());
        state.resolve(id).ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i32) -> StoreResult<Product> {
        let mut state = self.state.write().await;
        let product = state.resolve(id).ok_or(StoreError::NotFound(id))?;

        state.products.remove(&id);
        state.images.retain(|i| i.product_id != id);
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn store() -> InMemoryProductStore {
        InMemoryProductStore::new()
            .with_category(1, "Electronics")
            .with_category(2, "Books")
            .with_brand(1, "Acme")
    }

    fn fields(sku: &str, category_id: i32) -> ProductFields {
        ProductFields {
            name: format!("Product {sku}"),
            description: "desc".to_string(),
            price: Decimal::new(1999, 2),
            category_id,
            brand_id: 1,
            stock: 5,
            sku: sku.to_string(),
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_ascending() {
        let store = store();
        let a = store.create(&fields("A", 1)).await.unwrap();
        let b = store.create(&fields("B", 1)).await.unwrap();
        assert!(a.id < b.id);

        let ids: Vec<i32> = store.list_all().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected() {
        let store = store();
        store.create(&fields("A", 1)).await.unwrap();
        let err = store.create(&fields("A", 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSku(sku) if sku == "A"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_may_keep_own_sku_but_not_take_another() {
        let store = store();
        let a = store.create(&fields("A", 1)).await.unwrap();
        store.create(&fields("B", 1)).await.unwrap();

        let same = store.update(a.id, &fields("A", 2)).await.unwrap();
        assert_eq!(same.category.name, "Books");

        let err = store.update(a.id, &fields("B", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn unknown_category_is_a_missing_reference() {
        let err = store().create(&fields("A", 99)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { kind: "category", id: 99 }));
    }

    #[tokio::test]
    async fn category_lookup_ignores_case() {
        let store = store();
        store.create(&fields("A", 1)).await.unwrap();
        store.create(&fields("B", 2)).await.unwrap();

        let lower = store.list_by_category("electronics").await.unwrap();
        let upper = store.list_by_category("ELECTRONICS").await.unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.len(), 1);
        assert_eq!(lower[0].sku, "A");
    }

    #[tokio::test]
    async fn delete_returns_product_with_images_and_drops_them() {
        let store = store();
        let p = store.create(&fields("A", 1)).await.unwrap();
        store.add_image(p.id, 2, "b.png").await.unwrap();
        store.add_image(p.id, 1, "a.png").await.unwrap();

        let deleted = store.delete(p.id).await.unwrap();
        let urls: Vec<&str> = deleted.images.iter().map(|i| i.image_url.as_str()).collect();
        assert_eq!(urls, vec!["a.png", "b.png"]);

        assert!(store.get_by_id(p.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
        assert!(matches!(store.delete(p.id).await, Err(StoreError::NotFound(_))));
    }
}
