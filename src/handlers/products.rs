use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{Method, StatusCode},
    response::Response,
    Json,
};
use tracing::{debug, info};

use super::{respond, Outcome};
use crate::{
    error::{ApiError, ApiResult},
    models::{ProductFields, ProductPayload},
    responses::{Payload, RouteKey},
    AppState,
};

type Body = Result<Json<ProductPayload>, JsonRejection>;
type Param = Result<Path<String>, PathRejection>;

fn parse_id(raw: &str) -> ApiResult<i32> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::Validation(format!("invalid product id {raw:?}"))),
    }
}

fn parse_category(raw: &str) -> ApiResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("category name must not be blank".to_string()));
    }
    Ok(name)
}

fn parse_body(body: Body) -> ApiResult<ProductFields> {
    let Json(payload) = body?;
    Ok(ProductFields::try_from(payload)?)
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(State(state): State<AppState>) -> Response {
    let outcome = list_all(&state).await;
    respond(&state, RouteKey::Products, Method::GET, outcome)
}

async fn list_all(state: &AppState) -> Outcome {
    let start = Instant::now();
    let products = state.store.list_all().await?;

    info!(
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Listed products"
    );

    Ok((StatusCode::OK, Payload::List(products)))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(State(state): State<AppState>, id: Param) -> Response {
    let outcome = get_one(&state, id).await;
    respond(&state, RouteKey::ProductById, Method::GET, outcome)
}

async fn get_one(state: &AppState, raw_id: Param) -> Outcome {
    let Path(raw_id) = raw_id?;
    let id = parse_id(&raw_id)?;
    let product = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id}")))?;

    debug!(id, "Fetched product");
    Ok((StatusCode::OK, Payload::Single(product)))
}

// ── By category ───────────────────────────────────────────────────────────────

pub async fn list_products_by_category(
    State(state): State<AppState>,
    name: Param,
) -> Response {
    let outcome = list_by_category(&state, name).await;
    respond(&state, RouteKey::ProductsByCategory, Method::GET, outcome)
}

async fn list_by_category(state: &AppState, raw_name: Param) -> Outcome {
    let Path(raw_name) = raw_name?;
    let name = parse_category(&raw_name)?;
    let products = state.store.list_by_category(name).await?;
    if products.is_empty() {
        return Err(ApiError::NotFound(format!("no products in category {name:?}")));
    }

    info!(category = name, count = products.len(), "Listed products by category");
    Ok((StatusCode::OK, Payload::List(products)))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(State(state): State<AppState>, body: Body) -> Response {
    let outcome = create(&state, body).await;
    respond(&state, RouteKey::Products, Method::POST, outcome)
}

async fn create(state: &AppState, body: Body) -> Outcome {
    let fields = parse_body(body)?;

    if state.store.exists_by_sku(&fields.sku).await? {
        return Err(ApiError::Conflict(format!("sku {} already exists", fields.sku)));
    }

    let product = state.store.create(&fields).await?;
    info!(id = product.id, sku = %product.sku, "Created product");

    Ok((StatusCode::CREATED, Payload::Single(product)))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    id: Param,
    body: Body,
) -> Response {
    let outcome = update(&state, id, body).await;
    respond(&state, RouteKey::ProductById, Method::PUT, outcome)
}

async fn update(state: &AppState, raw_id: Param, body: Body) -> Outcome {
    let Path(raw_id) = raw_id?;
    let id = parse_id(&raw_id)?;
    let fields = parse_body(body)?;

    if state.store.get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("product {id}")));
    }

    let product = state.store.update(id, &fields).await?;
    info!(id, sku = %product.sku, "Updated product");

    Ok((StatusCode::OK, Payload::Single(product)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(State(state): State<AppState>, id: Param) -> Response {
    let outcome = delete(&state, id).await;
    respond(&state, RouteKey::ProductById, Method::DELETE, outcome)
}

async fn delete(state: &AppState, raw_id: Param) -> Outcome {
    let Path(raw_id) = raw_id?;
    let id = parse_id(&raw_id)?;

    if state.store.get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("product {id}")));
    }

    let product = state.store.delete(id).await?;
    info!(id, sku = %product.sku, "Deleted product");

    Ok((StatusCode::OK, Payload::Single(product)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        for raw in ["", " 7", "7 ", "0", "-3", "abc", "1.5", "99999999999"] {
            assert!(
                matches!(parse_id(raw), Err(ApiError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn category_names_are_trimmed_and_non_blank() {
        assert_eq!(parse_category("  Electronics ").unwrap(), "Electronics");
        assert!(matches!(parse_category("   "), Err(ApiError::Validation(_))));
    }
}
