//! REST API server for StarChain
//!
//! Thin HTTP layer over [`Ledger`]: request parsing, JSON responses and
//! mapping ledger errors onto status codes. No ledger rules live here.

use axum::{
    extract::{Path, Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{
    hash_from_hex, hash_to_hex, Block, ChainIssue, Ledger, Sha256Hash, StarClaim,
    VALIDATION_WINDOW_SECS,
};
use crate::config::ApiConfig;
use crate::error::LedgerError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Node {
    pub ledger: Arc<Ledger>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    challenges_issued: u64,
    stars_registered: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl Node {
    /// Wrap an already initialized ledger.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    /// Get API statistics
    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            challenges_issued: stats.challenges_issued,
            stars_registered: stats.stars_registered,
            uptime_seconds: uptime,
            chain_height: self.ledger.height(),
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    InvalidInput(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(e) => {
                let status = match &e {
                    LedgerError::MalformedMessage(_) => StatusCode::BAD_REQUEST,
                    LedgerError::ChallengeExpired { .. }
                    | LedgerError::OwnershipVerificationFailed => StatusCode::UNAUTHORIZED,
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::Uninitialized => StatusCode::SERVICE_UNAVAILABLE,
                    LedgerError::ChainCorrupted(_)
                    | LedgerError::BlockInvalid { .. }
                    | LedgerError::Decode(_)
                    | LedgerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ValidationRequest {
    pub address: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub address: String,
    pub message: String,
    pub window_secs: i64,
}

#[derive(Deserialize)]
pub struct SubmitStarRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
    pub star: serde_json::Value,
}

#[derive(Serialize)]
pub struct ChainValidationResponse {
    pub valid: bool,
    pub errors: Vec<ChainIssue>,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub challenges_issued: u64,
    pub stars_registered: u64,
    pub uptime_seconds: u64,
    pub chain_height: i64,
}

#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_page() -> u64 {
    0
}
fn default_limit() -> u64 {
    10
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Parses a 64-character hex string into a Sha256Hash ([u8; 32]).
fn parse_hash(hash_str: &str) -> Result<Sha256Hash, ApiError> {
    hash_from_hex(hash_str).map_err(|e| ApiError::InvalidInput(format!("Invalid hex hash: {}", e)))
}

// ============================================================================
// Middleware
// ============================================================================

/// Request statistics middleware
async fn stats_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status, duration and the chain height.
async fn logging_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        chain_height = %node.ledger.height(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        // Chain endpoints
        .route("/blockchain/height", get(get_blockchain_height))
        .route("/blockchain/blocks", get(get_blocks))
        .route("/block/height/:height", get(get_block_by_height))
        .route("/block/hash/:hash", get(get_block_by_hash))
        .route("/validateChain", get(validate_chain))
        // Ownership endpoints
        .route("/requestValidation", post(request_validation))
        .route("/submitstar", post(submit_star))
        .route("/blocks/:address", get(get_stars_by_owner))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing
        .layer(middleware::from_fn_with_state(node.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Serve the API until the listener fails.
pub async fn run_api_server(
    node: Arc<Node>,
    config: &ApiConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let height = node.ledger.height();
    let (status, label) = if node.ledger.is_initialized() && height >= 0 {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "height": height,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

async fn get_blockchain_height(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.ledger.height())
}

async fn get_blocks(
    State(node): State<Arc<Node>>,
    Query(params): Query<PaginationQuery>,
) -> impl IntoResponse {
    let blocks = node.ledger.blocks();
    let total = blocks.len();

    let limit = params.limit.min(100); // Max 100 blocks per request
    let offset = params.page.saturating_mul(limit);

    let page: Vec<Block> = blocks
        .into_iter()
        .rev()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect();

    Json(serde_json::json!({
        "blocks": page,
        "total": total,
        "page": params.page,
        "limit": limit
    }))
}

async fn get_block_by_height(
    State(node): State<Arc<Node>>,
    Path(height): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    node.ledger
        .get_block_by_height(height)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Block at height {} not found", height)))
}

async fn get_block_by_hash(
    State(node): State<Arc<Node>>,
    Path(hash_str): Path<String>,
) -> Result<Json<Block>, ApiError> {
    let hash = parse_hash(&hash_str)?;
    Ok(Json(node.ledger.get_block_by_hash(&hash)?))
}

async fn validate_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let errors = node.ledger.validate_chain();
    Json(ChainValidationResponse {
        valid: errors.is_empty(),
        errors,
    })
}

async fn request_validation(
    State(node): State<Arc<Node>>,
    Json(req): Json<ValidationRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let address = req.address.trim();
    if address.is_empty() || address.contains(':') {
        return Err(ApiError::InvalidInput(
            "address must be non-empty and must not contain ':'".to_string(),
        ));
    }

    let message = node.ledger.request_ownership_challenge(address);
    node.api_stats.write().await.challenges_issued += 1;

    Ok(Json(ChallengeResponse {
        address: address.to_string(),
        message,
        window_secs: VALIDATION_WINDOW_SECS,
    }))
}

async fn submit_star(
    State(node): State<Arc<Node>>,
    Json(req): Json<SubmitStarRequest>,
) -> Result<Json<Block>, ApiError> {
    let block = node
        .ledger
        .submit_star(&req.address, &req.message, &req.signature, req.star)?;

    node.api_stats.write().await.stars_registered += 1;
    tracing::info!(
        owner = %req.address,
        height = block.height,
        hash = %block.hash.as_ref().map(hash_to_hex).unwrap_or_default(),
        "star registered"
    );

    Ok(Json(block))
}

async fn get_stars_by_owner(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
) -> Json<Vec<StarClaim>> {
    Json(node.ledger.get_stars_by_owner(&address))
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}
