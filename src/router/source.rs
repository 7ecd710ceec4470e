// Route source
// This file sources candidate routes for a request: backend pathfinding
// toward a destination, caller hinted partial paths extended over private
// channels, or both, each re-quantified by route assembly
//
// Numan Thabit 2025 Nov

use crate::errors::{LedgerError, RouterError};
use crate::ledger::types::{QueryRoutesRequest, MTOKENS_PER_TOKEN};
use crate::ledger::{ChannelId, LedgerNode};
use crate::router::assembly::route_from_hops;
use crate::router::cache::{hops_from_channels, ChannelCache, ResolvedChannel};
use crate::router::exclusion::{resolve_exclusions, ExclusionSet, IgnoreEntry};
use crate::router::routes::{AssembledRoute, HintHop};
use crate::router::selector::RouteRanker;
use crate::router::validation::validate_route_request;
use futures::future::try_join_all;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Final CLTV delta used when the caller does not give one.
pub const DEFAULT_FINAL_CLTV_DELTA: u32 = 40;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetRoutesRequest {
    /// Final destination public key.
    #[serde(default)]
    pub destination: Option<String>,
    /// Maximum fee in tokens.
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub ignore: Vec<IgnoreEntry>,
    /// Hinted paths, each starting at a publicly reachable node.
    #[serde(default)]
    pub routes: Vec<Vec<HintHop>>,
    /// Start pathfinding from this node instead of our own.
    #[serde(default)]
    pub start: Option<String>,
    /// Final CLTV delta.
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub tokens: u64,
}

/// One candidate path after the backend has been consulted.
enum Candidate {
    /// Caller named every channel; assemble from the hint hops alone.
    Explicit(Vec<HintHop>),
    /// Backend routes to the path's entry node, to be extended with the
    /// trailing hint hops.
    Discovered {
        base: Vec<AssembledRoute>,
        extension: Vec<HintHop>,
    },
}

/// Race a backend call against caller cancellation.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, RouterError>
where
    F: Future<Output = Result<T, RouterError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RouterError::Cancelled),
        result = call => result,
    }
}

pub struct RouteSource {
    ledger: Arc<dyn LedgerNode>,
    final_cltv_delta: u32,
}

impl RouteSource {
    pub fn new(ledger: Arc<dyn LedgerNode>, final_cltv_delta: u32) -> Self {
        Self {
            ledger,
            final_cltv_delta,
        }
    }

    /// Candidate routes for the request, within the fee budget and cheapest first.
    #[tracing::instrument(skip_all, fields(destination = ?req.destination, hints = req.routes.len(), tokens = req.tokens))]
    pub async fn get_routes(
        &self,
        req: &GetRoutesRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<AssembledRoute>, RouterError> {
        validate_route_request(req).into_result()?;

        let ledger = self.ledger.as_ref();
        let final_cltv_delta = req
            .timeout
            .filter(|&delta| delta > 0)
            .unwrap_or(self.final_cltv_delta);
        let mtokens = req
            .tokens
            .checked_mul(MTOKENS_PER_TOKEN)
            .ok_or_else(|| RouterError::validation("tokens overflow millitokens"))?;

        let resolved = cancellable(cancel, async {
            Ok::<_, RouterError>(resolve_exclusions(ledger, &req.ignore).await)
        })
        .await?;
        let exclusions = ExclusionSet::from_entries(&resolved);

        let mut paths = req.routes.clone();
        if let Some(destination) = &req.destination {
            paths.push(vec![HintHop::to_node(destination.clone())]);
        }

        let query = |target: String| QueryRoutesRequest {
            tokens: req.tokens,
            fee_limit: req.fee,
            final_cltv_delta,
            exclusions: exclusions.clone(),
            target,
            source: req.start.clone(),
        };

        let candidates = cancellable(
            cancel,
            try_join_all(paths.into_iter().map(|path| self.discover(path, &query))),
        )
        .await?;

        let ranker = RouteRanker::new(req.fee);

        if req.routes.is_empty() {
            let routes: Vec<AssembledRoute> = candidates
                .into_iter()
                .flat_map(|candidate| match candidate {
                    Candidate::Discovered { base, .. } => base,
                    Candidate::Explicit(_) => Vec::new(),
                })
                .collect();
            info!(routes = routes.len(), "sourced routes from pathfinding");
            return Ok(ranker.rank(routes));
        }

        let height = cancellable(cancel, async { ledger.get_info().await.map_err(RouterError::from) })
            .await?
            .current_block_height;
        let mut cache = ChannelCache::with_hints(&req.routes, req.tokens);
        let mut routes = Vec::new();

        for candidate in candidates {
            let channel_paths: Vec<Vec<(Option<ChannelId>, String)>> = match candidate {
                Candidate::Explicit(path) => vec![hint_channels(&path)],
                Candidate::Discovered { base, extension } => base
                    .iter()
                    .map(|route| {
                        route
                            .hops
                            .iter()
                            .map(|hop| (Some(hop.channel), hop.public_key.clone()))
                            .chain(hint_channels(&extension))
                            .collect()
                    })
                    .collect(),
            };

            for path in channel_paths {
                let mut channels = Vec::with_capacity(path.len());
                for (channel, destination) in path {
                    let id = channel.ok_or_else(|| {
                        RouterError::validation(format!("expected channel for hop to {destination}"))
                    })?;
                    let record = cancellable(cancel, cache.resolve(ledger, id)).await?;
                    channels.push(ResolvedChannel { record, destination });
                }
                let hops = hops_from_channels(&channels);
                routes.push(route_from_hops(&hops, height, final_cltv_delta, mtokens)?);
            }
        }

        info!(
            routes = routes.len(),
            channels_fetched = cache.cached(),
            "assembled routes from hints"
        );
        Ok(ranker.rank(routes))
    }

    async fn discover(
        &self,
        path: Vec<HintHop>,
        query: &impl Fn(String) -> QueryRoutesRequest,
    ) -> Result<Candidate, RouterError> {
        let Some(first) = path.first() else {
            return Err(RouterError::validation("expected hops in route"));
        };
        if first.channel.is_some() {
            debug!(hops = path.len(), "route fully specified; skipping pathfinding");
            return Ok(Candidate::Explicit(path));
        }

        let base = match self.ledger.query_routes(&query(first.public_key.clone())).await {
            Ok(routes) => routes,
            Err(LedgerError::NoPath(reason)) => {
                debug!(target_key = %first.public_key, %reason, "no path to route entry node");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Candidate::Discovered {
            base,
            extension: path[1..].to_vec(),
        })
    }
}

fn hint_channels(hops: &[HintHop]) -> Vec<(Option<ChannelId>, String)> {
    hops.iter()
        .map(|hop| (hop.channel, hop.public_key.clone()))
        .collect()
}
