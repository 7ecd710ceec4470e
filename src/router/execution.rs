// Payment executor - drives one payment attempt along assembled routes
// This file opens a single route execution subscription against the ledger
// node and folds its attempt events into one classified outcome
//
// Numan Thabit 2025 Nov

use crate::errors::RouterError;
use crate::ledger::types::{
    decimal, AttemptEvent, AttemptFailure, AttemptSuccess, SendToRouteRequest,
};
use crate::ledger::LedgerNode;
use crate::metrics::PAYMENT_OUTCOMES;
use crate::router::routes::{AssembledRoute, HopResult};
use crate::router::source::cancellable;
use crate::router::validation::validate_payment_request;
use futures::StreamExt;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Code recorded for transient backend errors seen mid attempt.
const TRANSIENT_ERROR_CODE: u16 = 503;

/// Execution statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayViaRoutesRequest {
    /// Hex payment hash; a random one is used when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Milliseconds the backend may spend on pathfinding between attempts.
    #[serde(default)]
    pub pathfinding_timeout: Option<u64>,
    /// Tried in order by the backend.
    #[serde(default)]
    pub routes: Vec<AssembledRoute>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub failures: Vec<AttemptFailure>,
    pub fee: u64,
    #[serde(with = "decimal")]
    pub fee_mtokens: u64,
    pub hops: Vec<HopResult>,
    pub id: String,
    pub is_confirmed: bool,
    pub is_outgoing: bool,
    #[serde(with = "decimal")]
    pub mtokens: u64,
    pub secret: String,
    pub tokens: u64,
}

impl PaymentReceipt {
    fn new(success: AttemptSuccess, failures: Vec<AttemptFailure>) -> Self {
        let route = success.route;
        Self {
            failures,
            fee: route.fee,
            fee_mtokens: route.fee_mtokens,
            hops: route.hops,
            id: success.id,
            is_confirmed: true,
            is_outgoing: true,
            mtokens: route.mtokens,
            secret: success.secret,
            tokens: route.tokens,
        }
    }
}

/// Events folded so far in one attempt.
#[derive(Debug, Default)]
struct PaymentOutcome {
    failures: Vec<AttemptFailure>,
    success: Option<AttemptSuccess>,
}

impl PaymentOutcome {
    /// Returns true once the outcome is terminal.
    fn record(&mut self, event: AttemptEvent) -> bool {
        match event {
            AttemptEvent::Success(success) => {
                self.success = Some(success);
                true
            }
            AttemptEvent::Failure(failure) => {
                debug!(
                    code = failure.code,
                    message = %failure.message,
                    channel = ?failure.channel,
                    "payment attempt failed"
                );
                self.failures.push(failure);
                false
            }
            AttemptEvent::TransientError(details) => {
                warn!(details = %details, "transient error during payment attempt");
                self.failures
                    .push(AttemptFailure::new(TRANSIENT_ERROR_CODE, details));
                false
            }
        }
    }

    fn resolve(self) -> Result<PaymentReceipt, RouterError> {
        if let Some(success) = self.success {
            return Ok(PaymentReceipt::new(success, self.failures));
        }
        let Some(last) = self.failures.last() else {
            return Err(RouterError::ProtocolViolation);
        };
        let (code, message) = (last.code, last.message.clone());
        Err(RouterError::PaymentFailure {
            code,
            message,
            failures: self.failures,
        })
    }
}

/// Payment executor over the ledger node's route execution stream
pub struct PaymentExecutor {
    ledger: Arc<dyn LedgerNode>,
    default_pathfinding_timeout: Option<Duration>,
    total_executions: AtomicU64,
    successful_executions: AtomicU64,
    failed_executions: AtomicU64,
}

impl PaymentExecutor {
    pub fn new(ledger: Arc<dyn LedgerNode>, default_pathfinding_timeout: Option<Duration>) -> Self {
        Self {
            ledger,
            default_pathfinding_timeout,
            total_executions: AtomicU64::new(0),
            successful_executions: AtomicU64::new(0),
            failed_executions: AtomicU64::new(0),
        }
    }

    /// Get execution statistics
    pub fn get_stats(&self) -> ExecutionStats {
        let total = self.total_executions.load(Ordering::Relaxed);
        let successful = self.successful_executions.load(Ordering::Relaxed);
        let failed = self.failed_executions.load(Ordering::Relaxed);

        ExecutionStats {
            total_executions: total,
            successful_executions: successful,
            failed_executions: failed,
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Pay along the routes, resolving once the attempt stream reaches a
    /// terminal state or ends.
    #[tracing::instrument(skip_all, fields(routes = req.routes.len()))]
    pub async fn pay_via_routes(
        &self,
        req: PayViaRoutesRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentReceipt, RouterError> {
        validate_payment_request(&req).into_result()?;

        self.total_executions.fetch_add(1, Ordering::Relaxed);
        let result = self.attempt(req, cancel).await;

        let outcome = match &result {
            Ok(_) => {
                self.successful_executions.fetch_add(1, Ordering::Relaxed);
                "success"
            }
            Err(err) => {
                self.failed_executions.fetch_add(1, Ordering::Relaxed);
                match err {
                    RouterError::PaymentFailure { .. } => "failure",
                    RouterError::ProtocolViolation => "protocol_violation",
                    RouterError::Cancelled => "cancelled",
                    _ => "error",
                }
            }
        };
        PAYMENT_OUTCOMES.with_label_values(&[outcome]).inc();
        result
    }

    async fn attempt(
        &self,
        req: PayViaRoutesRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentReceipt, RouterError> {
        let id = req.id.unwrap_or_else(random_payment_id);
        let request = SendToRouteRequest {
            id: id.clone(),
            routes: req.routes,
            pathfinding_timeout: req
                .pathfinding_timeout
                .map(Duration::from_millis)
                .or(self.default_pathfinding_timeout),
        };

        let mut events = cancellable(cancel, async {
            self.ledger
                .send_to_route(request)
                .await
                .map_err(RouterError::from)
        })
        .await?;

        let mut outcome = PaymentOutcome::default();
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(id = %id, "payment attempt cancelled");
                    return Err(RouterError::Cancelled);
                }
                event = events.next() => event,
            };
            let Some(event) = event else { break };
            if outcome.record(event) {
                break;
            }
        }
        drop(events);

        let result = outcome.resolve();
        match &result {
            Ok(receipt) => info!(
                id = %id,
                fee_mtokens = receipt.fee_mtokens,
                failures = receipt.failures.len(),
                "payment succeeded"
            ),
            Err(err) => info!(id = %id, code = err.code(), error = %err, "payment did not succeed"),
        }
        result
    }
}

fn random_payment_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
