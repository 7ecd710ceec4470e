// Router HTTP API implementation
// This file ties route sourcing, ranking and payment execution together
// and provides the HTTP endpoints over them
//
// Numan Thabit 2025 Nov

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router as AxumRouter,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::{PaymentExecutor, RouteRanker, RouteSource};
use crate::errors::RouterError;
use crate::ledger::graph::network_graph;
use crate::ledger::types::{
    AttemptFailure, BackupRequest, BackupVerification, ChannelRecord, NetworkGraph,
};
use crate::ledger::{ChannelId, LedgerNode};
use crate::router::execution::{ExecutionStats, PayViaRoutesRequest, PaymentReceipt};
use crate::router::routes::{AssembledRoute, RouteSelection};
use crate::router::source::GetRoutesRequest;

/// High-level Router over one ledger node
pub struct Router {
    ledger: Arc<dyn LedgerNode>,
    source: RouteSource,
    executor: PaymentExecutor,
    /// Parent of every per-request cancellation token.
    shutdown: CancellationToken,
}

impl Router {
    pub fn new(ledger: Arc<dyn LedgerNode>, source: RouteSource, executor: PaymentExecutor) -> Self {
        Self {
            ledger,
            source,
            executor,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token cancels every in-flight request.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn get_routes(
        &self,
        req: &GetRoutesRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<AssembledRoute>, RouterError> {
        self.source.get_routes(req, cancel).await
    }

    /// Select the cheapest route without paying (for quote/preview)
    pub async fn select_route(
        &self,
        req: &GetRoutesRequest,
        cancel: &CancellationToken,
    ) -> Result<RouteSelection, RouterError> {
        let routes = self.source.get_routes(req, cancel).await?;
        RouteRanker::new(req.fee).select(routes)
    }

    pub async fn pay_via_routes(
        &self,
        req: PayViaRoutesRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentReceipt, RouterError> {
        self.executor.pay_via_routes(req, cancel).await
    }

    pub async fn get_channel(&self, id: ChannelId) -> Result<ChannelRecord, RouterError> {
        Ok(self.ledger.get_channel(id).await?)
    }

    pub async fn network_graph(&self) -> Result<NetworkGraph, RouterError> {
        let raw = self.ledger.describe_graph().await?;
        Ok(network_graph(&raw)?)
    }

    /// Backend rejection of the backup is a verdict, not an error.
    pub async fn verify_backup(&self, req: &BackupRequest) -> Result<BackupVerification, RouterError> {
        if hex::decode(&req.backup).is_err() {
            return Err(RouterError::validation("expected hex encoded channel backup"));
        }
        if !matches!(hex::decode(&req.transaction_id), Ok(bytes) if bytes.len() == 32) {
            return Err(RouterError::validation("expected funding transaction id"));
        }

        match self.ledger.verify_channel_backup(req).await {
            Ok(()) => Ok(BackupVerification {
                is_valid: true,
                err: None,
            }),
            Err(err) => {
                debug!(error = %err, "channel backup rejected");
                Ok(BackupVerification {
                    is_valid: false,
                    err: Some(err.to_string()),
                })
            }
        }
    }

    pub fn stats(&self) -> ExecutionStats {
        self.executor.get_stats()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AttemptFailure>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: RouterError) -> ApiError {
    let code = err.code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(code, error = %err, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            code,
            error: err.to_string(),
            failures: err.failures().to_vec(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<AssembledRoute>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub execution: ExecutionStats,
}

/// Create the HTTP router with API endpoints
pub fn create_api_router(router: Arc<Router>) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/api/v1/routes", post(get_routes))
        .route("/api/v1/routes/best", post(best_route))
        .route("/api/v1/pay", post(pay))
        .route("/api/v1/channels/:id", get(get_channel))
        .route("/api/v1/graph", get(get_graph))
        .route("/api/v1/backups/verify", post(verify_backup))
        .route("/api/v1/stats", get(get_stats))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(router)
}

/// Health check endpoint
async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn get_routes(
    State(router): State<Arc<Router>>,
    Json(req): Json<GetRoutesRequest>,
) -> Result<Json<RoutesResponse>, ApiError> {
    let cancel = router.shutdown.child_token();
    let routes = router.get_routes(&req, &cancel).await.map_err(api_error)?;
    Ok(Json(RoutesResponse { routes }))
}

/// Quote endpoint - cheapest route and its alternatives, without paying
async fn best_route(
    State(router): State<Arc<Router>>,
    Json(req): Json<GetRoutesRequest>,
) -> Result<Json<RouteSelection>, ApiError> {
    let cancel = router.shutdown.child_token();
    let selection = router.select_route(&req, &cancel).await.map_err(api_error)?;
    Ok(Json(selection))
}

async fn pay(
    State(router): State<Arc<Router>>,
    Json(req): Json<PayViaRoutesRequest>,
) -> Result<Json<PaymentReceipt>, ApiError> {
    let cancel = router.shutdown.child_token();
    let receipt = router.pay_via_routes(req, &cancel).await.map_err(api_error)?;
    Ok(Json(receipt))
}

async fn get_channel(
    State(router): State<Arc<Router>>,
    Path(id): Path<String>,
) -> Result<Json<ChannelRecord>, ApiError> {
    let id: ChannelId = id
        .parse()
        .map_err(|e| api_error(RouterError::validation(format!("{e}"))))?;
    let channel = router.get_channel(id).await.map_err(api_error)?;
    Ok(Json(channel))
}

async fn get_graph(State(router): State<Arc<Router>>) -> Result<Json<NetworkGraph>, ApiError> {
    let graph = router.network_graph().await.map_err(api_error)?;
    Ok(Json(graph))
}

async fn verify_backup(
    State(router): State<Arc<Router>>,
    Json(req): Json<BackupRequest>,
) -> Result<Json<BackupVerification>, ApiError> {
    let verdict = router.verify_backup(&req).await.map_err(api_error)?;
    Ok(Json(verdict))
}

/// Get payment execution statistics
async fn get_stats(State(router): State<Arc<Router>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        execution: router.stats(),
    })
}

async fn metrics() -> impl IntoResponse {
    match crate::metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            err.to_string(),
        ),
    }
}
