use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tracing::{info, warn};

use crate::config::settings::SettingsConfig;
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::providers::ProviderServices;
use crate::server::{health, routes};

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub services: Arc<ProviderServices>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(metrics: &Metrics, services: Arc<ProviderServices>) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            services,
            started_at: Instant::now(),
        }
    }
}

/// Health routes at the root, provider routes under the api prefix, the
/// optional metrics route, and a JSON 404 for everything else.
pub fn build_router(state: AppState, settings_config: &SettingsConfig) -> Router {
    let prefix = settings_config.server.api_prefix.as_str();
    let app = Router::new().merge(health::router());
    let app = if prefix.is_empty() {
        app.merge(routes::api_router())
    } else {
        app.nest(prefix, routes::api_router())
    };

    app.merge(state.metrics_state.router(&settings_config.metrics))
        .route_layer(middleware::from_fn(track_responses))
        .fallback(health::not_found)
        .with_state(state)
}

async fn track_responses(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().clone();
    let start = get_instant();

    let response = next.run(request).await;

    let status = response.status();
    get_metrics()
        .await
        .http_responses
        .with_label_values(&[route.as_str(), status.as_str()])
        .inc();
    info!(
        method = %method,
        route = %route,
        status = status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

/// Bind and serve until ctrl-c or SIGTERM.
pub async fn start(settings_config: &SettingsConfig, services: Arc<ProviderServices>) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, services);
    let app = build_router(state, settings_config);

    let address = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("cannot bind {}", address))?;
    info!(address = %address, api_prefix = %settings_config.server.api_prefix, "server listening");

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")?;
    metrics.up.set(0);

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
