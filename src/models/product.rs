use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product category. Name lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i32,
    pub name: String,
}

/// One image of a product. Images are presented ascending by `display_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    pub display_order: i32,
    pub image_url: String,
}

/// Product with its category, brand and ordered images resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    /// Always uppercase, unique across products.
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: i32,
    pub brand_id: i32,
    pub category: Category,
    pub brand: Brand,
    pub images: Vec<ProductImage>,
}

/// Canonical stored form of a SKU.
pub fn normalize_sku(sku: &str) -> String {
    sku.to_uppercase()
}

/// Sorts images into presentation order (display order, then id).
pub fn sort_images(images: &mut [ProductImage]) {
    images.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Raw POST/PUT body. Every field is optional here so that missing fields are
/// reported by [`ProductFields::try_from`] instead of a serde rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    pub stock: Option<i32>,
    pub sku: Option<String>,
}

/// Validated product fields, ready to be written. The SKU is already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: i32,
    pub brand_id: i32,
    pub stock: i32,
    pub sku: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("{0} must be >= 0")]
    Negative(&'static str),
}

impl TryFrom<ProductPayload> for ProductFields {
    type Error = ProductValidationError;

    fn try_from(payload: ProductPayload) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        if payload.name.is_none() {
            missing.push("name");
        }
        if payload.description.is_none() {
            missing.push("description");
        }
        if payload.price.is_none() {
            missing.push("price");
        }
        if payload.category_id.is_none() {
            missing.push("category_id");
        }
        if payload.brand_id.is_none() {
            missing.push("brand_id");
        }
        if payload.stock.is_none() {
            missing.push("stock");
        }
        if payload.sku.is_none() {
            missing.push("sku");
        }

        match payload {
            ProductPayload {
                name: Some(name),
                description: Some(description),
                price: Some(price),
                category_id: Some(category_id),
                brand_id: Some(brand_id),
                stock: Some(stock),
                sku: Some(sku),
            } => {
                if sku.trim().is_empty() {
                    return Err(ProductValidationError::Blank("sku"));
                }
                if name.trim().is_empty() {
                    return Err(ProductValidationError::Blank("name"));
                }
                if price < Decimal::ZERO {
                    return Err(ProductValidationError::Negative("price"));
                }
                if stock < 0 {
                    return Err(ProductValidationError::Negative("stock"));
                }

                Ok(Self {
                    name,
                    description,
                    price,
                    category_id,
                    brand_id,
                    stock,
                    sku: normalize_sku(&sku),
                })
            }
            _ => Err(ProductValidationError::Missing(missing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> ProductPayload {
        ProductPayload {
            name: Some("Notebook".to_string()),
            description: Some("14 inch".to_string()),
            price: Some(Decimal::new(349_990, 2)),
            category_id: Some(1),
            brand_id: Some(2),
            stock: Some(10),
            sku: Some("abc-1".to_string()),
        }
    }

    fn image(id: i32, display_order: i32) -> ProductImage {
        ProductImage {
            id,
            product_id: 1,
            display_order,
            image_url: format!("https://cdn.example.com/{id}.png"),
        }
    }

    #[test]
    fn sku_is_uppercased_on_validation() {
        let fields = ProductFields::try_from(full_payload()).unwrap();
        assert_eq!(fields.sku, "ABC-1");
        assert_eq!(fields.name, "Notebook");
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let payload = ProductPayload {
            sku: Some("x".to_string()),
            ..Default::default()
        };
        let err = ProductFields::try_from(payload).unwrap_err();
        assert_eq!(
            err,
            ProductValidationError::Missing(vec![
                "name",
                "description",
                "price",
                "category_id",
                "brand_id",
                "stock"
            ])
        );
        assert!(err.to_string().starts_with("missing required fields: name, description"));
    }

    #[test]
    fn blank_sku_is_rejected() {
        let mut payload = full_payload();
        payload.sku = Some("   ".to_string());
        assert_eq!(
            ProductFields::try_from(payload).unwrap_err(),
            ProductValidationError::Blank("sku")
        );
    }

    #[test]
    fn negative_stock_is_rejected() {
        let mut payload = full_payload();
        payload.stock = Some(-1);
        assert_eq!(
            ProductFields::try_from(payload).unwrap_err(),
            ProductValidationError::Negative("stock")
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut payload = full_payload();
        payload.price = Some(Decimal::new(-1, 2));
        assert_eq!(
            ProductFields::try_from(payload).unwrap_err(),
            ProductValidationError::Negative("price")
        );
    }

    #[test]
    fn price_accepts_number_or_string() {
        let from_number: ProductPayload = serde_json::from_str(r#"{"price": 20}"#).unwrap();
        let from_string: ProductPayload = serde_json::from_str(r#"{"price": "20.00"}"#).unwrap();
        assert_eq!(from_number.price, from_string.price);
        assert_eq!(from_string.price, Some(Decimal::new(2000, 2)));
    }

    #[test]
    fn images_sort_by_display_order_then_id() {
        let mut images = vec![image(3, 2), image(2, 1), image(1, 2)];
        sort_images(&mut images);
        let ids: Vec<i32> = images.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
