//! Cellgraph HTTP Server
//!
//! A thin HTTP surface over the cellgraph gateway. Each endpoint maps to
//! one gateway operation; all shaping and nested resolution happens in
//! `cellgraph-gateway`.
//!
//! # Endpoints
//!
//! - `GET /v1/dashboards` - Dashboards with their analyses
//! - `GET /v1/analyses` - All analyses
//! - `GET /v1/analyses/{id}?dashboard=D` - One analysis within a dashboard
//! - `GET /v1/analyses/{id}/tree/root` - Tree root node
//! - `GET /v1/analyses/{id}/tree/node?id=..|index=..` - One tree node
//! - `GET /v1/analyses/{id}/tree/nodes?min=..&max=..` - Node range
//! - `GET /v1/analyses/{id}/chromosomes` - Chromosome coordinate extents
//! - `GET /v1/analyses/{id}/segs?indices=0,1,2` - Per-cell seg rows
//! - `GET /v1/analyses/{id}/clone-segs?min=..&max=..` - Reconstructed segs
//! - `GET /v1/analyses/{id}/ploidy` - QC dataset presence
//! - `GET /v1/health` - Health check
//!
//! # Example
//!
//! ```bash
//! cellgraph-httpd --backend-url http://localhost:9200 --listen 0.0.0.0:4000
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cellgraph_backend::{BackendConfig, BackendError, HttpBackend};
use cellgraph_gateway::{
    Analysis, Chromosome, Dashboard, Gateway, GatewayConfig, GatewayError, IndexRange,
    NodeSelector, Seg, SegRow, TreeNode,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Cellgraph HTTP Server
#[derive(Parser, Debug)]
#[command(name = "cellgraph-httpd")]
#[command(about = "HTTP server for the cellgraph query gateway")]
struct Args {
    /// Base URL of the document-search backend
    #[arg(long, env = "CELLGRAPH_BACKEND_URL")]
    backend_url: String,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0:4000", env = "CELLGRAPH_LISTEN")]
    listen: SocketAddr,

    /// Per-analysis dataset name prefix
    #[arg(long, default_value = "ce00", env = "CELLGRAPH_DATASET_PREFIX")]
    dataset_prefix: String,

    /// Dataset holding analysis records
    #[arg(long, default_value = "analysis", env = "CELLGRAPH_ANALYSES_DATASET")]
    analyses_dataset: String,

    /// Concurrency bound for nested lookups
    #[arg(long, default_value = "8", env = "CELLGRAPH_LOOKUP_CONCURRENCY")]
    lookup_concurrency: usize,

    /// Backend connection timeout in milliseconds
    #[arg(long, default_value = "5000", env = "CELLGRAPH_CONNECT_TIMEOUT_MS")]
    connect_timeout_ms: u64,

    /// Backend request timeout in milliseconds
    #[arg(long, default_value = "30000", env = "CELLGRAPH_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: u64,
}

/// Application state shared across handlers.
struct AppState {
    gateway: Gateway,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cellgraph_httpd=info".parse().unwrap())
                .add_directive("cellgraph_gateway=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(
        backend_url = %args.backend_url,
        listen = %args.listen,
        dataset_prefix = %args.dataset_prefix,
        "Starting Cellgraph HTTP Server"
    );

    let backend_config = BackendConfig::new(&args.backend_url)
        .with_connect_timeout_ms(args.connect_timeout_ms)
        .with_request_timeout_ms(args.request_timeout_ms);
    let backend = HttpBackend::from_config(&backend_config).expect("Failed to create backend");

    let gateway_config = GatewayConfig::default()
        .with_dataset_prefix(args.dataset_prefix)
        .with_analyses_dataset(args.analyses_dataset)
        .with_lookup_concurrency(args.lookup_concurrency);
    let gateway = Gateway::new(Arc::new(backend), gateway_config);

    let state = Arc::new(AppState { gateway });

    let app = Router::new()
        .route("/v1/dashboards", get(handle_dashboards))
        .route("/v1/analyses", get(handle_analyses))
        .route("/v1/analyses/{analysis_id}", get(handle_analysis))
        .route("/v1/analyses/{analysis_id}/tree/root", get(handle_tree_root))
        .route("/v1/analyses/{analysis_id}/tree/node", get(handle_tree_node))
        .route(
            "/v1/analyses/{analysis_id}/tree/nodes",
            get(handle_tree_nodes),
        )
        .route(
            "/v1/analyses/{analysis_id}/chromosomes",
            get(handle_chromosomes),
        )
        .route("/v1/analyses/{analysis_id}/segs", get(handle_segs))
        .route(
            "/v1/analyses/{analysis_id}/clone-segs",
            get(handle_clone_segs),
        )
        .route("/v1/analyses/{analysis_id}/ploidy", get(handle_ploidy))
        .route("/v1/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .expect("Failed to bind address");

    info!(address = %args.listen, "Server listening");

    axum::serve(listener, app).await.expect("Server error");
}

/// API error with an HTTP status mapping.
enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(entity) => {
                (StatusCode::NOT_FOUND, format!("{entity} not found"))
            }
            ApiError::Gateway(err) => {
                let status = match &err {
                    GatewayError::Backend(BackendError::Timeout { .. }) => {
                        StatusCode::GATEWAY_TIMEOUT
                    }
                    GatewayError::Backend(_) => StatusCode::BAD_GATEWAY,
                    GatewayError::DanglingReference { .. }
                    | GatewayError::MissingBinState { .. }
                    | GatewayError::MalformedDocument { .. }
                    | GatewayError::ResultShape(_) => {
                        error!(%err, "data integrity error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn handle_dashboards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Dashboard>>, ApiError> {
    Ok(Json(state.gateway.dashboards().await?))
}

async fn handle_analyses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Analysis>>, ApiError> {
    Ok(Json(state.gateway.analyses().await?))
}

#[derive(Deserialize)]
struct AnalysisParams {
    dashboard: String,
}

async fn handle_analysis(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<Analysis>, ApiError> {
    state
        .gateway
        .analysis(&analysis_id, &params.dashboard)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("analysis"))
}

async fn handle_tree_root(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
) -> Result<Json<TreeNode>, ApiError> {
    state
        .gateway
        .tree_root(&analysis_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("tree root"))
}

#[derive(Deserialize)]
struct NodeParams {
    id: Option<String>,
    index: Option<i64>,
}

async fn handle_tree_node(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
    Query(params): Query<NodeParams>,
) -> Result<Json<TreeNode>, ApiError> {
    let selector = match (params.id, params.index) {
        (Some(id), None) => NodeSelector::Id(id),
        (None, Some(index)) => NodeSelector::Index(index),
        _ => {
            return Err(ApiError::BadRequest(
                "exactly one of 'id' or 'index' must be given".to_string(),
            ))
        }
    };

    state
        .gateway
        .tree_node(&analysis_id, selector)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("tree node"))
}

#[derive(Deserialize)]
struct RangeParams {
    min: i64,
    max: i64,
}

async fn handle_tree_nodes(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<TreeNode>>, ApiError> {
    let nodes = state
        .gateway
        .tree_nodes(&analysis_id, IndexRange::new(params.min, params.max))
        .await?;
    Ok(Json(nodes))
}

async fn handle_chromosomes(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
) -> Result<Json<Vec<Chromosome>>, ApiError> {
    Ok(Json(state.gateway.chromosomes(&analysis_id).await?))
}

#[derive(Deserialize)]
struct SegsParams {
    /// Comma-separated ordering indices.
    indices: String,
}

async fn handle_segs(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
    Query(params): Query<SegsParams>,
) -> Result<Json<Vec<SegRow>>, ApiError> {
    let indices = params
        .indices
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::BadRequest(format!("invalid indices: {e}")))?;

    Ok(Json(state.gateway.segs(&analysis_id, &indices).await?))
}

async fn handle_clone_segs(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<Seg>>, ApiError> {
    let segs = state
        .gateway
        .clone_segs(&analysis_id, IndexRange::new(params.min, params.max))
        .await?;
    Ok(Json(segs))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PloidyResponse {
    has_ploidy: bool,
}

async fn handle_ploidy(
    State(state): State<Arc<AppState>>,
    Path(analysis_id): Path<String>,
) -> Result<Json<PloidyResponse>, ApiError> {
    let has_ploidy = state.gateway.has_ploidy(&analysis_id).await?;
    Ok(Json(PloidyResponse { has_ploidy }))
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
