//! Order placement, cancellation and fulfillment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Order, OrderId, OrderLine, Page, ProductId};
use domain::{CreateOrder, OrderLineRequest};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, PageQuery, json_body, page_request, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

impl CreateOrderRequest {
    fn into_command(self) -> Result<CreateOrder, ApiError> {
        let lines = self
            .items
            .into_iter()
            .map(|item| {
                Ok(OrderLineRequest::new(
                    parse_id::<ProductId>(&item.product_id)?,
                    item.quantity,
                ))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;
        Ok(CreateOrder::new(lines))
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl From<OrderLine> for OrderItemResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.to_string(),
            items: order.lines.into_iter().map(Into::into).collect(),
            total_cents: order.total.cents(),
            payment_id: order.payment_id.map(|id| id.to_string()),
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderPageResponse {
    pub orders: Vec<OrderResponse>,
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl From<Page<Order>> for OrderPageResponse {
    fn from(page: Page<Order>) -> Self {
        let page = page.map(OrderResponse::from);
        Self {
            orders: page.content,
            current_page: page.page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

// -- Handlers --

/// POST /orders: reserve stock and place a pending order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let cmd = json_body(body)?.into_command()?;
    let order = state.orders.create(cmd).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders: list orders oldest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<OrderPageResponse>, ApiError> {
    let page = state.orders.list(page_request(query)?).await?;
    Ok(Json(page.into()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.get(parse_id::<OrderId>(&id)?).await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/{id}: cancel the order and return its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orders.cancel(parse_id::<OrderId>(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /orders/{id}: mark a paid order as delivered.
#[tracing::instrument(skip(state))]
pub async fn fulfill<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orders.fulfill(parse_id::<OrderId>(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
