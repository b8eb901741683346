//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use store::{Store, UnitOfWork};

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health: succeeds while the store can open a unit of work.
pub async fn check<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.store.begin().await {
        Ok(uow) => uow.rollback().await.is_ok(),
        Err(err) => {
            tracing::error!(error = %err, "health check could not reach the store");
            false
        }
    };

    if reachable {
        (StatusCode::OK, Json(HealthResponse { status: "ok" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
            }),
        )
    }
}
