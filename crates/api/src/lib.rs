//! Plant Alert Dispatcher Service
//!
//! HTTP host around the dispatch coordinator: push ingestion, user action
//! reports, action history, health and metrics.

use action_router::{Actuator, MockActuator};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dispatcher::DispatchCoordinator;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod actuator;
pub mod error;
pub mod presenter;
pub mod rate_limit;
mod routes;
pub mod settings;

use actuator::HttpPumpActuator;
use rate_limit::{create_governor_config, DefaultGovernorConfig};
use settings::ServiceConfig;

/// Application state shared across handlers
pub struct AppState {
    pub coordinator: DispatchCoordinator,
    /// Prometheus exporter, when installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(coordinator: DispatchCoordinator, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            coordinator,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub tracked_alerts: usize,
    pub in_flight_actions: usize,
}

/// Create the application router.
///
/// `rate_limit` guards the push endpoint only; it needs peer addresses, so
/// serve with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: Arc<AppState>, rate_limit: Option<Arc<DefaultGovernorConfig>>) -> Router {
    let mut push = Router::new().route("/api/v1/push", post(routes::push::receive_push));
    if let Some(config) = rate_limit {
        push = push.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/alerts/:id", get(routes::alerts::get_alert))
        .route("/api/v1/alerts/:id/actions", post(routes::alerts::post_action))
        .route("/api/v1/actions", get(routes::actions::get_actions))
        .route("/metrics", get(metrics_handler))
        .merge(push)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        tracked_alerts: state.coordinator.tracked(),
        in_flight_actions: state.coordinator.router().in_flight_count(),
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level: Level = level.parse()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Build the actuator named by the config, or a dry-run one
fn build_actuator(config: &ServiceConfig) -> Result<Arc<dyn Actuator>, Box<dyn std::error::Error>> {
    match &config.actuator_url {
        Some(url) => Ok(Arc::new(HttpPumpActuator::new(url, config.dispatch.actuator_timeout())?)),
        None => {
            warn!("No actuator_url configured, commands are acknowledged without a pump");
            Ok(Arc::new(MockActuator::acking()))
        }
    }
}

/// Run the server until Ctrl-C
pub async fn run_server(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = PrometheusBuilder::new().install_recorder()?;
    let actuator = build_actuator(&config)?;

    let (coordinator, events) = DispatchCoordinator::new(config.dispatch.clone(), actuator);
    let presenter = tokio::spawn(presenter::log_presentations(events));
    let sweeper = coordinator.spawn_sweeper();

    let governor = create_governor_config(&config.rate_limit).ok_or("invalid rate limit configuration")?;
    let state = Arc::new(AppState::new(coordinator, Some(metrics)));
    let app = create_router(state, Some(governor));

    info!("Starting API server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    presenter.abort();
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
