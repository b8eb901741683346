//! HTTP API server with observability for the order fulfillment core.
//!
//! Provides REST endpoints for products, orders and payments, with
//! structured logging (tracing) and Prometheus metrics.

pub mod authorizer;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::{OrderWorkflow, PaymentAuthorizer, PaymentWorkflow, ProductCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use authorizer::HttpPaymentAuthorizer;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .delete(routes::orders::cancel::<S>)
                .patch(routes::orders::fulfill::<S>),
        )
        .route(
            "/payments",
            get(routes::payments::list::<S>).post(routes::payments::create::<S>),
        )
        .route(
            "/payments/{id}",
            get(routes::payments::get::<S>).patch(routes::payments::authorize::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires every workflow over one store and one payment authorizer.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    authorizer: Arc<dyn PaymentAuthorizer>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: ProductCatalog::new(store.clone()),
        orders: OrderWorkflow::new(store.clone()),
        payments: PaymentWorkflow::new(store.clone(), authorizer),
        store,
    })
}
