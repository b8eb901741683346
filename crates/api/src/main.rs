//! API server entry point.

use std::sync::Arc;

use api::HttpPaymentAuthorizer;
use api::config::{Config, LogFormat};
use domain::{InMemoryPaymentAuthorizer, PaymentAuthorizer};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn build_authorizer(config: &Config) -> Arc<dyn PaymentAuthorizer> {
    match &config.authorizer_url {
        Some(url) => {
            tracing::info!(%url, timeout = ?config.authorizer_timeout, "using HTTP payment authorizer");
            Arc::new(
                HttpPaymentAuthorizer::new(url.clone(), config.authorizer_timeout)
                    .expect("failed to build authorizer HTTP client"),
            )
        }
        None => {
            tracing::warn!("AUTHORIZER_URL not set, every payment will be approved");
            Arc::new(InMemoryPaymentAuthorizer::new())
        }
    }
}

async fn serve<S: Store + Clone + 'static>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let state = api::create_default_state(store, build_authorizer(config));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store and serve
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database_max_connections)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            serve(store, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory only");
            serve(InMemoryStore::new(), &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
