//! HTTP surface for the gateway.
//!
//! Thin axum layer over [`QueryService`]: extract parameters, hand the
//! blocking pipeline to tokio's blocking pool, map errors to status codes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::errors::GatewayError;
use crate::output::Formatted;
use crate::query::QuerySpec;
use crate::service::{
    EarthquakeRequest, FeltRequest, HealthReport, QueryService, TsunamiParams, TsunamiRequest,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    service: QueryService,
}

impl AppState {
    #[must_use]
    pub fn new(service: QueryService) -> Self {
        Self { service }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/earthquake/sf", get(earthquakes_handler))
        .route("/earthquake-felt", get(felt_handler))
        .route("/tsunami/{state}", get(tsunami_handler))
        .with_state(state)
}

/// Start the web server.
pub async fn run_server(config: ServerConfig, service: QueryService) -> anyhow::Result<()> {
    let app = create_router(AppState::new(service));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("quakecache listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest { field, .. } => {
                tracing::debug!("rejected request: invalid {field}");
                StatusCode::BAD_REQUEST
            }
            Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encoding(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl IntoResponse for Formatted {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Run a validated spec on the blocking pool.
async fn execute(state: AppState, spec: QuerySpec) -> Result<Formatted, GatewayError> {
    tokio::task::spawn_blocking(move || state.service.run(&spec))
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Earthquakes around San Francisco.
async fn earthquakes_handler(
    State(state): State<AppState>,
    Query(req): Query<EarthquakeRequest>,
) -> Result<Formatted, GatewayError> {
    let spec = req.into_spec()?;
    execute(state, spec).await
}

/// Felt earthquakes around San Francisco.
async fn felt_handler(
    State(state): State<AppState>,
    Query(req): Query<FeltRequest>,
) -> Result<Formatted, GatewayError> {
    let spec = req.into_spec()?;
    execute(state, spec).await
}

/// Tsunami-flagged events for a state.
async fn tsunami_handler(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(params): Query<TsunamiParams>,
) -> Result<Formatted, GatewayError> {
    let spec = TsunamiRequest {
        state: region,
        params,
    }
    .into_spec()?;
    execute(state, spec).await
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthReport>, GatewayError> {
    let report = tokio::task::spawn_blocking(move || state.service.health())
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(report))
}
