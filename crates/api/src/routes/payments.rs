//! Payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, Page, Payment, PaymentId};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, PageQuery, json_body, page_request, parse_id};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            order_id: payment.order_id.to_string(),
            amount_cents: payment.amount.cents(),
            status: payment.status.to_string(),
            created_at: payment.created_at,
            authorized_at: payment.authorized_at,
            updated_at: payment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentPageResponse {
    pub payments: Vec<PaymentResponse>,
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl From<Page<Payment>> for PaymentPageResponse {
    fn from(page: Page<Payment>) -> Self {
        let page = page.map(PaymentResponse::from);
        Self {
            payments: page.content,
            current_page: page.page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

/// POST /payments: open the payment for an order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let order_id = parse_id::<OrderId>(&json_body(body)?.order_id)?;
    let payment = state.payments.create(order_id).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// GET /payments
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaymentPageResponse>, ApiError> {
    let page = state.payments.list(page_request(query)?).await?;
    Ok(Json(page.into()))
}

/// GET /payments/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state.payments.get(parse_id::<PaymentId>(&id)?).await?;
    Ok(Json(payment.into()))
}

/// PATCH /payments/{id}: ask the authorizer to approve the payment.
#[tracing::instrument(skip(state))]
pub async fn authorize<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.payments.authorize(parse_id::<PaymentId>(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
