//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Money, Page, Product, ProductId};
use domain::NewProduct;
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, PageQuery, json_body, page_request, parse_id};
use crate::error::ApiError;

const NAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=100;
const DESCRIPTION_LENGTH: std::ops::RangeInclusive<usize> = 10..=255;
const PRICE_CENTS: std::ops::RangeInclusive<i64> = 99..=500_000;
const STOCK_QUANTITY: std::ops::RangeInclusive<i64> = 0..=900;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl ProductRequest {
    /// Checks field bounds and returns every violation at once.
    fn validate(self) -> Result<NewProduct, ApiError> {
        let mut problems = Vec::new();
        let name = self.name.trim().to_string();
        if !NAME_LENGTH.contains(&name.chars().count()) {
            problems.push("name must be between 3 and 100 characters");
        }
        let description = self.description.trim().to_string();
        if !DESCRIPTION_LENGTH.contains(&description.chars().count()) {
            problems.push("description must be between 10 and 255 characters");
        }
        if !PRICE_CENTS.contains(&self.price_cents) {
            problems.push("price must be between 0.99 and 5000.00");
        }
        if !STOCK_QUANTITY.contains(&self.stock_quantity) {
            problems.push("stock_quantity must be between 0 and 900");
        }

        if !problems.is_empty() {
            return Err(ApiError::Validation(problems.join("; ")));
        }
        Ok(NewProduct {
            name,
            description,
            price: Money::from_cents(self.price_cents),
            stock_quantity: self.stock_quantity,
        })
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            description: product.description,
            price_cents: product.price.cents(),
            stock_quantity: product.stock_quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductPageResponse {
    pub products: Vec<ProductResponse>,
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl From<Page<Product>> for ProductPageResponse {
    fn from(page: Page<Product>) -> Self {
        let page = page.map(ProductResponse::from);
        Self {
            products: page.content,
            current_page: page.page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

// -- Handlers --

/// POST /products: add a product to the catalog.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let fields = json_body(body)?.validate()?;
    let product = state.catalog.create(fields).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products: list products by name.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ProductPageResponse>, ApiError> {
    let page = state.catalog.list(page_request(query)?).await?;
    Ok(Json(page.into()))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.get(parse_id::<ProductId>(&id)?).await?;
    Ok(Json(product.into()))
}

/// PUT /products/{id}: replace every field of a product.
#[tracing::instrument(skip(state, body))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_id::<ProductId>(&id)?;
    let fields = json_body(body)?.validate()?;
    let product = state.catalog.update(product_id, fields).await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(parse_id::<ProductId>(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
