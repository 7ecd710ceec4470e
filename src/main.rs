use anyhow::{anyhow, Context, Result};
use backoff::{future::retry, ExponentialBackoff};
use ln_router::config::AppConfig;
use ln_router::control::AdmissionControl;
use ln_router::ledger::types::WalletInfo;
use ln_router::ledger::LedgerNode;
use ln_router::router::{PaymentExecutor, RouteSource, Router};
use ln_router::transport::LndRest;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal router error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;

    // Initialize control plane
    let admission = AdmissionControl::new(config.max_inflight(), config.rate_per_sec);

    let lnd = LndRest::new(
        config.lnd_rest_endpoint.clone(),
        config.macaroon_hex.clone(),
        config.accept_invalid_certs.unwrap_or(false),
        admission,
    )
    .with_context(|| format!("connect ledger node {}", config.lnd_rest_endpoint))?;
    let ledger: Arc<dyn LedgerNode> = Arc::new(lnd);

    let source = RouteSource::new(ledger.clone(), config.final_cltv_delta());
    let executor = PaymentExecutor::new(ledger.clone(), config.pathfinding_timeout());
    let router = Arc::new(Router::new(ledger.clone(), source, executor));

    let app = App {
        config: Arc::new(config),
        ledger,
        router,
    };

    app.run().await
}

struct App {
    config: Arc<AppConfig>,
    ledger: Arc<dyn LedgerNode>,
    router: Arc<Router>,
}

impl App {
    async fn run(self) -> Result<()> {
        let info = self
            .readiness_probe()
            .await
            .context("ledger node readiness probe failed")?;

        info!(
            public_key = %info.public_key,
            height = info.current_block_height,
            endpoint = %self.config.lnd_rest_endpoint,
            "ln-router online"
        );

        // Start HTTP API server
        let api_router = ln_router::router::router::create_api_router(self.router.clone());
        let api_addr = self.config.api_addr();
        let listener = tokio::net::TcpListener::bind(&api_addr)
            .await
            .with_context(|| format!("bind API server address {api_addr}"))?;

        info!(address = %api_addr, "HTTP API server starting");
        let _api_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, api_router).await {
                warn!(error = %e, "API server error");
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = self.router.stats();
                    info!(
                        max_inflight = self.config.max_inflight(),
                        total_payments = stats.total_executions,
                        successful = stats.successful_executions,
                        failed = stats.failed_executions,
                        success_rate = stats.success_rate,
                        "ln-router heartbeat"
                    );
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, cancelling in-flight requests");
                    self.router.shutdown_token().cancel();
                    break;
                }
            }
        }
        Ok(())
    }

    /// Wait for the ledger node to answer before serving.
    async fn readiness_probe(&self) -> Result<WalletInfo> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Some(Duration::from_secs(60)),
            multiplier: 2.0,
            ..Default::default()
        };

        retry(backoff, || {
            let ledger = self.ledger.clone();
            async move {
                ledger.get_info().await.map_err(|err| {
                    warn!(error = %err, "ledger node not ready");
                    backoff::Error::transient(err)
                })
            }
        })
        .await
        .map_err(|e| anyhow!("ledger node unreachable after retries: {e}"))
    }
}

fn init_tracing() -> Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
