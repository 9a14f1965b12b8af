use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::{ProductStore, StoreError, StoreResult};
use crate::models::{sort_images, Brand, Category, Product, ProductFields, ProductImage};

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.sku, p.name, p.description, p.price, p.stock,
           p.category_id, c.name AS category_name,
           p.brand_id, b.name AS brand_name
    FROM products p
    JOIN categories c ON c.id = p.category_id
    JOIN brands b ON b.id = p.brand_id
"#;

/// Flat product row joined with its category and brand names.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    sku: String,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    category_id: i32,
    category_name: String,
    brand_id: i32,
    brand_name: String,
}

impl ProductRow {
    fn into_product(self, images: Vec<ProductImage>) -> Product {
        Product {
            id: self.id,
            sku: self.sku,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
            brand_id: self.brand_id,
            category: Category {
                id: self.category_id,
                name: self.category_name,
            },
            brand: Brand {
                id: self.brand_id,
                name: self.brand_name,
            },
            images,
        }
    }
}

/// Attaches images to their rows, keeping row order.
fn assemble(rows: Vec<ProductRow>, images: Vec<ProductImage>) -> Vec<Product> {
    let mut by_product: HashMap<i32, Vec<ProductImage>> = HashMap::new();
    for image in images {
        by_product.entry(image.product_id).or_default().push(image);
    }

    rows.into_iter()
        .map(|row| {
            let mut images = by_product.remove(&row.id).unwrap_or_default();
            sort_images(&mut images);
            row.into_product(images)
        })
        .collect()
}

async fn with_images(conn: &mut PgConnection, rows: Vec<ProductRow>) -> StoreResult<Vec<Product>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let images = sqlx::query_as::<_, ProductImage>(
        r#"
        SELECT id, product_id, display_order, image_url
        FROM products_images
        WHERE product_id = ANY($1)
        ORDER BY product_id, display_order ASC, id ASC
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    Ok(assemble(rows, images))
}

/// Single-product select. `lock` takes a row lock on the product (not on its
/// category or brand) until the surrounding transaction ends.
fn select_by_id(lock: bool) -> String {
    if lock {
        format!("{PRODUCT_SELECT} WHERE p.id = $1 FOR UPDATE OF p")
    } else {
        format!("{PRODUCT_SELECT} WHERE p.id = $1")
    }
}

async fn fetch_by_id(conn: &mut PgConnection, id: i32) -> StoreResult<Option<Product>> {
    fetch_one_product(conn, &select_by_id(false), id).await
}

async fn fetch_by_id_for_update(
    conn: &mut PgConnection,
    id: i32,
) -> StoreResult<Option<Product>> {
    fetch_one_product(conn, &select_by_id(true), id).await
}

async fn fetch_one_product(
    conn: &mut PgConnection,
    sql: &str,
    id: i32,
) -> StoreResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(with_images(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Maps constraint violations on insert/update to typed errors.
fn write_error(err: sqlx::Error, fields: &ProductFields) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateSku(fields.sku.clone());
        }
        if db_err.is_foreign_key_violation() {
            return match db_err.constraint() {
                Some(constraint) if constraint.contains("brand") => StoreError::MissingReference {
                    kind: "brand",
                    id: fields.brand_id,
                },
                _ => StoreError::MissingReference {
                    kind: "category",
                    id: fields.category_id,
                },
            };
        }
    }
    StoreError::Database(err)
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list_all(&self) -> StoreResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{PRODUCT_SELECT} ORDER BY p.id ASC");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        with_images(&mut conn, rows).await
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    async fn list_by_category(&self, name: &str) -> StoreResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{PRODUCT_SELECT} WHERE LOWER(c.name) = LOWER($1) ORDER BY p.id ASC");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;

        with_images(&mut conn, rows).await
    }

    async fn exists_by_sku(&self, sku: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1)")
                .bind(sku)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, fields: &ProductFields) -> StoreResult<Product> {
        let mut conn = self.pool.acquire().await?;
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO products (sku, name, description, price, stock, category_id, brand_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&fields.sku)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock)
        .bind(fields.category_id)
        .bind(fields.brand_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| write_error(e, fields))?;

        fetch_by_id(&mut conn, id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i32, fields: &ProductFields) -> StoreResult<Product> {
        let mut conn = self.pool.acquire().await?;
        let updated: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET sku         = $1,
                name        = $2,
                description = $3,
                price       = $4,
                stock       = $5,
                category_id = $6,
                brand_id    = $7
            WHERE id = $8
            RETURNING id
            "#,
        )
        .bind(&fields.sku)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock)
        .bind(fields.category_id)
        .bind(fields.brand_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| write_error(e, fields))?;

        if updated.is_none() {
            return Err(StoreError::NotFound(id));
        }

        fetch_by_id(&mut conn, id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i32) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;

        // Row stays locked until commit: the snapshot returned is what gets deleted.
        let product = fetch_by_id_for_update(&mut tx, id)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        // Images go with the product (ON DELETE CASCADE).
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }

        tx.commit().await?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32) -> ProductRow {
        ProductRow {
            id,
            sku: format!("SKU-{id}"),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::new(1000, 2),
            stock: 3,
            category_id: 1,
            category_name: "Electronics".to_string(),
            brand_id: 7,
            brand_name: "Acme".to_string(),
        }
    }

    fn image(id: i32, product_id: i32, display_order: i32) -> ProductImage {
        ProductImage {
            id,
            product_id,
            display_order,
            image_url: format!("img-{id}.png"),
        }
    }

    #[test]
    fn assemble_keeps_row_order_and_groups_images() {
        let images = vec![image(10, 2, 1), image(11, 1, 2), image(12, 1, 0)];
        let products = assemble(vec![row(1), row(2), row(3)], images);

        let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let first: Vec<i32> = products[0].images.iter().map(|i| i.id).collect();
        assert_eq!(first, vec![12, 11], "images must be ascending by display order");
        assert_eq!(products[1].images.len(), 1);
        assert!(products[2].images.is_empty());
    }

    #[test]
    fn assemble_resolves_category_and_brand() {
        let product = assemble(vec![row(5)], Vec::new()).remove(0);
        assert_eq!(product.category, Category { id: 1, name: "Electronics".to_string() });
        assert_eq!(product.brand, Brand { id: 7, name: "Acme".to_string() });
    }

    #[test]
    fn only_the_delete_path_locks_the_product_row() {
        let locked = select_by_id(true);
        assert!(locked.trim_end().ends_with("WHERE p.id = $1 FOR UPDATE OF p"));

        let plain = select_by_id(false);
        assert!(plain.trim_end().ends_with("WHERE p.id = $1"));
        assert!(!plain.contains("FOR UPDATE"));
    }

    #[test]
    fn non_database_errors_pass_through() {
        let fields = ProductFields {
            name: "x".to_string(),
            description: String::new(),
            price: Decimal::ZERO,
            category_id: 1,
            brand_id: 1,
            stock: 0,
            sku: "X".to_string(),
        };
        let err = write_error(sqlx::Error::RowNotFound, &fields);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
