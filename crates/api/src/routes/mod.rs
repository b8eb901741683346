//! HTTP handlers and the state they share.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod products;

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use common::PageRequest;
use domain::{OrderWorkflow, PaymentAuthorizer, PaymentWorkflow, ProductCatalog};
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub catalog: ProductCatalog<S>,
    pub orders: OrderWorkflow<S>,
    pub payments: PaymentWorkflow<S, Arc<dyn PaymentAuthorizer>>,
}

/// `?page_number=&page_size=` on list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn into_request(self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page_number.unwrap_or(defaults.page),
            self.page_size.unwrap_or(defaults.size),
        )
    }
}

/// Turns a query-string rejection into a validation error.
pub(crate) fn page_request(
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<PageRequest, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(query.into_request())
}

/// Turns a JSON body rejection into a validation error.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::Validation(e.body_text()))
}

/// Parses a path segment into a typed ID.
pub(crate) fn parse_id<T: FromStr>(id: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::Validation(format!("Invalid ID format: {e}")))
}
