//! REST API for GenAuth
//!
//! A thin boundary over [`Ledger`]: it checks that submissions carry every
//! required field, serializes ledger results, and serializes mining so the
//! dequeue-and-admit step never races another miner.

use axum::{
    extract::{Path, Request, State},
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
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Admission, ArtifactClaim, Block, Ledger, MineOutcome, PendingArtifact, Rejection};
use crate::config::ApiConfig;
use crate::error::ChainError;
use crate::miner::proof_of_work;

/// Shared ledger handle plus request bookkeeping.
#[derive(Clone)]
pub struct Node {
    pub ledger: Arc<RwLock<Ledger>>,
    /// Held for the whole dequeue, search and admit sequence.
    mining_lock: Arc<Mutex<()>>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    artifacts_submitted: u64,
    blocks_mined: u64,
    empty_mines: u64,
    rejected_mines: u64,
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
    pub fn new(ledger: Ledger) -> Self {
        Self::new_shared(Arc::new(RwLock::new(ledger)))
    }

    /// Build a node over a ledger handle that other components also hold.
    pub fn new_shared(ledger: Arc<RwLock<Ledger>>) -> Self {
        Self {
            ledger,
            mining_lock: Arc::new(Mutex::new(())),
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn submit(&self, claim: ArtifactClaim) -> String {
        let artifact_id = self.ledger.write().await.submit(claim);
        self.api_stats.write().await.artifacts_submitted += 1;
        artifact_id
    }

    /// Mine the oldest pending artifact.
    ///
    /// The ledger lock is released while the proof-of-work runs on a blocking
    /// thread, so reads and submissions stay responsive; `mining_lock` keeps
    /// other miners out until admission finishes.
    ///
    /// The work runs on its own task. Dropping the returned future (a client
    /// hanging up mid-search) does not abandon a dequeued artifact: the block
    /// is still searched and admitted.
    pub async fn mine(&self) -> Result<MineOutcome, ApiError> {
        let node = self.clone();
        tokio::spawn(async move { node.mine_next().await })
            .await
            .map_err(|e| ApiError::InternalError(format!("Mining task failed: {}", e)))?
    }

    async fn mine_next(&self) -> Result<MineOutcome, ApiError> {
        let _mining = self.mining_lock.lock().await;

        let (candidate, difficulty) = {
            let mut ledger = self.ledger.write().await;
            (ledger.next_candidate(), ledger.difficulty())
        };

        let outcome = match candidate {
            None => MineOutcome::Empty,
            Some(mut block) => {
                let (block, proof) = tokio::task::spawn_blocking(move || {
                    let proof = proof_of_work(&mut block, difficulty);
                    (block, proof)
                })
                .await
                .map_err(|e| ApiError::InternalError(format!("Mining task failed: {}", e)))?;

                match self.ledger.write().await.add_block(block, &proof)? {
                    Admission::Accepted(index) => MineOutcome::Mined(index),
                    Admission::Rejected(rejection) => MineOutcome::Rejected(rejection),
                }
            }
        };

        let mut stats = self.api_stats.write().await;
        match outcome {
            MineOutcome::Mined(_) => stats.blocks_mined += 1,
            MineOutcome::Empty => stats.empty_mines += 1,
            MineOutcome::Rejected(_) => stats.rejected_mines += 1,
        }
        Ok(outcome)
    }

    /// Get API statistics
    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            artifacts_submitted: stats.artifacts_submitted,
            blocks_mined: stats.blocks_mined,
            empty_mines: stats.empty_mines,
            rejected_mines: stats.rejected_mines,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    LedgerError(ChainError),
    MissingFields(Vec<&'static str>),
    NotFound(String),
    Rejected(Rejection),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::LedgerError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                format!("Missing fields: {}", fields.join(", ")),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Rejected(rejection) => (
                StatusCode::CONFLICT,
                format!("Block rejected: {}", rejection),
            ),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::LedgerError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Submission body. Every field is optional here so that absent fields can be
/// reported by name instead of as a generic parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    pub agent_name: Option<String>,
    pub content_hash: Option<String>,
    pub fingerprint: Option<String>,
    pub purpose: Option<String>,
    pub signature: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl SubmitRequest {
    pub fn into_claim(self) -> Result<ArtifactClaim, ApiError> {
        match self {
            SubmitRequest {
                agent_name: Some(agent_name),
                content_hash: Some(content_hash),
                fingerprint: Some(fingerprint),
                purpose: Some(purpose),
                signature: Some(signature),
                tags: Some(tags),
            } => Ok(ArtifactClaim {
                agent_name,
                content_hash,
                fingerprint,
                purpose,
                signature,
                tags,
            }),
            req => {
                let missing = [
                    ("agent_name", req.agent_name.is_none()),
                    ("content_hash", req.content_hash.is_none()),
                    ("fingerprint", req.fingerprint.is_none()),
                    ("purpose", req.purpose.is_none()),
                    ("signature", req.signature.is_none()),
                    ("tags", req.tags.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ApiError::MissingFields(missing))
            }
        }
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub id: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: Option<u64>,
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub count: usize,
    pub artifacts: Vec<PendingArtifact>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub artifacts_submitted: u64,
    pub blocks_mined: u64,
    pub empty_mines: u64,
    pub rejected_mines: u64,
    pub uptime_seconds: u64,
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    node.api_stats.write().await.record_request(success);

    response
}

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
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
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    let api_routes = Router::new()
        // Ledger endpoints
        .route("/submit", post(submit_artifact))
        .route("/mine", get(mine_artifact).post(mine_artifact))
        .route("/chain", get(get_chain))
        .route("/chain/:index", get(get_block_by_index))
        .route("/pending", get(get_pending))
        .route("/validate", get(validate_chain))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node.clone());

    // Unprefixed paths kept for clients of the earlier service
    let root_routes = Router::new()
        .route("/submit", post(submit_artifact))
        .route("/mine", get(mine_artifact).post(mine_artifact))
        .route("/chain", get(get_chain))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node);

    Router::new()
        .nest("/api", api_routes)
        .merge(root_routes)
        .layer(cors)
}

pub async fn run_api_server(node: Arc<Node>, config: &ApiConfig) -> Result<(), ChainError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ChainError::Config(format!("Invalid API address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, build_api_router(node)).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let ledger = node.ledger.read().await;
    Json(serde_json::json!({
        "status": "healthy",
        "chain_length": ledger.get_chain().len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn submit_artifact(
    State(node): State<Arc<Node>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let claim = req.into_claim()?;
    let id = node.submit(claim).await;
    Ok(Json(SubmitResponse {
        message: "Artifact submitted".to_string(),
        id,
    }))
}

async fn mine_artifact(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    match node.mine().await? {
        MineOutcome::Mined(index) => Ok(Json(MineResponse {
            message: format!("Block #{} mined", index),
            index: Some(index),
        })),
        MineOutcome::Empty => Ok(Json(MineResponse {
            message: "No artifacts to mine".to_string(),
            index: None,
        })),
        MineOutcome::Rejected(rejection) => Err(ApiError::Rejected(rejection)),
    }
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<Vec<Block>> {
    Json(node.ledger.read().await.get_chain().to_vec())
}

async fn get_block_by_index(
    State(node): State<Arc<Node>>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    let ledger = node.ledger.read().await;
    ledger
        .get_chain()
        .get(index as usize)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Block #{} not found", index)))
}

async fn get_pending(State(node): State<Arc<Node>>) -> Json<PendingResponse> {
    let ledger = node.ledger.read().await;
    Json(PendingResponse {
        count: ledger.pending_count(),
        artifacts: ledger.pending().iter().cloned().collect(),
    })
}

async fn validate_chain(State(node): State<Arc<Node>>) -> Json<ValidateResponse> {
    let ledger = node.ledger.read().await;
    let result = ledger.validate_chain();
    Json(ValidateResponse {
        valid: result.is_ok(),
        length: ledger.get_chain().len(),
        error: result.err().map(|e| e.to_string()),
    })
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> Json<ApiStatsResponse> {
    Json(node.get_stats().await)
}
