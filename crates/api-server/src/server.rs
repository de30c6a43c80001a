//! API server — router assembly, the HTTP listener and the metrics exporter.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wreckshop_core::config::{ApiConfig, AppConfig};
use wreckshop_journey::JourneyEngine;

use crate::journey_rest;
use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;

/// Routes mounted under the configured path prefix.
fn journey_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/journeys",
            get(journey_rest::list_journeys).post(journey_rest::create_journey),
        )
        .route(
            "/journeys/:id",
            get(journey_rest::get_journey)
                .patch(journey_rest::update_journey)
                .delete(journey_rest::delete_journey),
        )
        .route("/journeys/:id/publish", post(journey_rest::publish_journey))
        .route("/journeys/:id/pause", post(journey_rest::pause_journey))
        .route("/journeys/:id/resume", post(journey_rest::resume_journey))
        .route("/journeys/:id/duplicate", post(journey_rest::duplicate_journey))
        .route("/journeys/:id/audit", get(journey_rest::journey_audit))
        .route("/journeys/:id/funnel", get(journey_rest::journey_funnel))
        .route("/ping", get(rest::ping))
}

/// Full application router: journey routes under `config.path_prefix`,
/// probes and API docs at the root.
pub fn build_router(state: AppState, config: &ApiConfig) -> Router {
    let root = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness));

    let prefix = config.path_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        root.merge(journey_routes())
    } else {
        root.nest(
            prefix,
            journey_routes().route("/health", get(rest::health_check)),
        )
    };

    let app = app.layer(CompressionLayer::new());
    let app = if config.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Main API server: REST endpoints plus the Prometheus exporter.
pub struct ApiServer {
    config: AppConfig,
    engine: Arc<JourneyEngine>,
}

impl ApiServer {
    pub fn new(config: AppConfig, engine: Arc<JourneyEngine>) -> Self {
        Self { config, engine }
    }

    pub fn router(&self) -> Router {
        let state = AppState::new(self.engine.clone(), self.config.service_name.clone());
        build_router(state, &self.config.api)
    }

    /// Serve HTTP until `shutdown` resolves, then drain in-flight requests.
    pub async fn start_http<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = SocketAddr::new(
            self.config.api.host.parse::<IpAddr>()?,
            self.config.api.http_port,
        );

        info!(
            addr = %addr,
            prefix = %self.config.api.path_prefix,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Install the Prometheus recorder and its scrape listener on
    /// `metrics.port`. Must run inside the tokio runtime.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(
            self.config.api.host.parse::<IpAddr>()?,
            self.config.metrics.port,
        );
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
