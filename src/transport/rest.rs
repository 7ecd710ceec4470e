// REST transport layer implementation
// This file implements the ledger node client over the node's REST gateway:
// channel and graph lookups, pathfinding, route execution and backup checks
//
// Numan Thabit 2025 Nov

use crate::control::AdmissionControl;
use crate::errors::{LedgerError, NoPathReason};
use crate::ledger::graph::{channel_edge_as_channel, parse_channel_number, RawEdge, RawGraph};
use crate::ledger::types::{
    decimal, AttemptEvent, AttemptFailure, AttemptSuccess, BackupRequest, ChannelRecord,
    QueryRoutesRequest, SendToRouteRequest, WalletInfo, MTOKENS_PER_TOKEN,
};
use crate::ledger::{AttemptStream, ChannelId, LedgerNode};
use crate::metrics::{REQ_ERRORS, REQ_LATENCY};
use crate::router::exclusion::ExclusionSet;
use crate::router::routes::{AssembledRoute, HopResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use futures::StreamExt;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use url::Url;

const SERVICE: &str = "lnd";
const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";

const EDGE_NOT_FOUND: &str = "edge not found";
const EDGE_ZOMBIE: &str = "edge marked as zombie";

/// Classified code and message for failures without a wire code.
const UNEXPECTED_FAILURE: (u16, &str) = (503, "UnexpectedPayViaRoutesFailure");

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireInfo {
    identity_pubkey: String,
    #[serde(default)]
    block_height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireHop {
    #[serde(default)]
    chan_id: String,
    #[serde(default, with = "decimal")]
    chan_capacity: u64,
    #[serde(default, with = "decimal")]
    amt_to_forward: u64,
    #[serde(default, with = "decimal")]
    fee: u64,
    #[serde(default)]
    expiry: u32,
    #[serde(default, with = "decimal")]
    amt_to_forward_msat: u64,
    #[serde(default, with = "decimal")]
    fee_msat: u64,
    #[serde(default)]
    pub_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireRoute {
    #[serde(default)]
    total_time_lock: u32,
    #[serde(default, with = "decimal")]
    total_fees: u64,
    #[serde(default, with = "decimal")]
    total_amt: u64,
    #[serde(default)]
    hops: Vec<WireHop>,
    #[serde(default, with = "decimal")]
    total_fees_msat: u64,
    #[serde(default, with = "decimal")]
    total_amt_msat: u64,
}

#[derive(Debug, Deserialize)]
struct WireRoutes {
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct WireEdgeLocator {
    channel_id: String,
    direction_reverse: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct WireNodePair {
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct WireFeeLimit {
    #[serde(with = "decimal")]
    fixed: u64,
}

#[derive(Debug, Serialize)]
struct WireQueryRoutes {
    final_cltv_delta: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_limit: Option<WireFeeLimit>,
    ignored_edges: Vec<WireEdgeLocator>,
    ignored_nodes: Vec<String>,
    ignored_pairs: Vec<WireNodePair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_pub_key: Option<String>,
    use_mission_control: bool,
}

#[derive(Debug, Deserialize)]
struct WireChannelUpdate {
    #[serde(default)]
    chan_id: String,
}

#[derive(Debug, Deserialize)]
struct WireFailure {
    #[serde(default)]
    code: String,
    #[serde(default)]
    channel_update: Option<WireChannelUpdate>,
    #[serde(default)]
    failure_source_index: usize,
}

#[derive(Debug, Deserialize)]
struct WireAttempt {
    #[serde(default)]
    status: String,
    #[serde(default)]
    route: Option<WireRoute>,
    #[serde(default)]
    preimage: Option<String>,
    #[serde(default)]
    failure: Option<WireFailure>,
}

/// Backend messages meaning no route exists.
pub fn classify_no_path(message: &str) -> Option<NoPathReason> {
    let message = message.to_ascii_lowercase();
    if message.contains("unable to find a path") || message.contains("no path found") {
        Some(NoPathReason::NoPathFound)
    } else if message.contains("no route found") {
        Some(NoPathReason::NoRouteFound)
    } else if message.contains("insufficient") {
        Some(NoPathReason::InsufficientCapacity)
    } else if message.contains("max hops") {
        Some(NoPathReason::MaxHopsExceeded)
    } else if message.contains("target not found") || message.contains("not in network") {
        Some(NoPathReason::TargetNotInNetwork)
    } else {
        None
    }
}

/// Classification code and message for a wire failure code.
pub fn classify_failure(code: &str) -> (u16, &'static str) {
    match code {
        "INCORRECT_OR_UNKNOWN_PAYMENT_DETAILS" | "UNKNOWN_PAYMENT_HASH" => {
            (404, "UnknownPaymentHash")
        }
        "INCORRECT_PAYMENT_AMOUNT" => (404, "IncorrectPaymentAmount"),
        "FINAL_INCORRECT_CLTV_EXPIRY" => (404, "FinalIncorrectCltvExpiry"),
        "FINAL_INCORRECT_HTLC_AMOUNT" => (404, "FinalIncorrectHtlcAmount"),
        "FINAL_EXPIRY_TOO_SOON" => (404, "FinalExpiryTooSoon"),
        "INVALID_REALM" => (503, "InvalidRealm"),
        "EXPIRY_TOO_SOON" => (503, "ExpiryTooSoon"),
        "EXPIRY_TOO_FAR" => (503, "ExpiryTooFar"),
        "INVALID_ONION_VERSION" => (503, "InvalidOnionVersion"),
        "INVALID_ONION_HMAC" => (503, "InvalidOnionHmac"),
        "INVALID_ONION_KEY" => (503, "InvalidOnionKey"),
        "INVALID_ONION_PAYLOAD" => (503, "InvalidOnionPayload"),
        "AMOUNT_BELOW_MINIMUM" => (503, "AmountBelowMinimum"),
        "FEE_INSUFFICIENT" => (503, "FeeInsufficient"),
        "INCORRECT_CLTV_EXPIRY" => (503, "IncorrectCltvExpiry"),
        "CHANNEL_DISABLED" => (503, "ChannelDisabled"),
        "TEMPORARY_CHANNEL_FAILURE" => (503, "TemporaryChannelFailure"),
        "REQUIRED_NODE_FEATURE_MISSING" => (503, "RequiredNodeFeatureMissing"),
        "REQUIRED_CHANNEL_FEATURE_MISSING" => (503, "RequiredChannelFeatureMissing"),
        "UNKNOWN_NEXT_PEER" => (503, "UnknownNextPeer"),
        "TEMPORARY_NODE_FAILURE" => (503, "TemporaryNodeFailure"),
        "PERMANENT_NODE_FAILURE" => (503, "PermanentNodeFailure"),
        "PERMANENT_CHANNEL_FAILURE" => (503, "PermanentChannelFailure"),
        "MPP_TIMEOUT" => (503, "MppTimeout"),
        _ => UNEXPECTED_FAILURE,
    }
}

fn key_b64(public_key: &str) -> Result<String, LedgerError> {
    hex::decode(public_key)
        .map(|bytes| B64.encode(bytes))
        .map_err(|_| LedgerError::Malformed(format!("invalid public key {public_key:?}")))
}

/// Node 1 of a channel is the lexicographically smaller key.
fn is_reverse(from_public_key: &str, to_public_key: &str) -> bool {
    from_public_key > to_public_key
}

fn query_body(request: &QueryRoutesRequest) -> Result<WireQueryRoutes, LedgerError> {
    let exclusions: &ExclusionSet = &request.exclusions;

    let mut ignored_edges: Vec<WireEdgeLocator> = exclusions
        .channels()
        .flat_map(|channel| {
            [false, true].map(|direction_reverse| WireEdgeLocator {
                channel_id: channel.number().to_string(),
                direction_reverse,
            })
        })
        .collect();
    ignored_edges.extend(exclusions.edges().map(|edge| WireEdgeLocator {
        channel_id: edge.channel.number().to_string(),
        direction_reverse: is_reverse(&edge.from_public_key, &edge.to_public_key),
    }));

    let ignored_pairs = exclusions
        .pairs()
        .map(|pair| {
            Ok(WireNodePair {
                from: key_b64(&pair.from_public_key)?,
                to: key_b64(&pair.to_public_key)?,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    let ignored_nodes = exclusions
        .nodes()
        .map(|node| key_b64(node))
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(WireQueryRoutes {
        final_cltv_delta: request.final_cltv_delta,
        fee_limit: request.fee_limit.map(|fixed| WireFeeLimit { fixed }),
        ignored_edges,
        ignored_nodes,
        ignored_pairs,
        source_pub_key: request.source.clone(),
        use_mission_control: true,
    })
}

/// Parse a backend route.
///
/// The backend reports each hop's outgoing amount and expiry, that is what
/// the hop's node passes on to the next hop. An assembled hop carries the
/// amount and expiry arriving over its channel, so hop i takes hop i-1's
/// outgoing values and the first hop takes the route totals.
fn route_from_wire(route: WireRoute) -> Result<AssembledRoute, LedgerError> {
    let mut arriving = (route.total_amt_msat, route.total_time_lock);
    let mut hops = Vec::with_capacity(route.hops.len());
    for hop in route.hops {
        let (forward_mtokens, timeout) = arriving;
        hops.push(HopResult {
            channel: parse_channel_number(&hop.chan_id)?,
            channel_capacity: hop.chan_capacity,
            fee: hop.fee,
            fee_mtokens: hop.fee_msat,
            forward: forward_mtokens / MTOKENS_PER_TOKEN,
            forward_mtokens,
            public_key: hop.pub_key,
            timeout,
        });
        arriving = (hop.amt_to_forward_msat, hop.expiry);
    }

    if hops.is_empty() {
        return Err(LedgerError::Malformed("route without hops".into()));
    }

    Ok(AssembledRoute {
        fee: route.total_fees,
        fee_mtokens: route.total_fees_msat,
        hops,
        mtokens: route.total_amt_msat,
        timeout: route.total_time_lock,
        tokens: route.total_amt,
    })
}

/// Inverse of `route_from_wire`: hop i is sent with hop i+1's arriving
/// amount and expiry, the last hop keeps its own.
fn route_to_wire(route: &AssembledRoute) -> WireRoute {
    let hops = route
        .hops
        .iter()
        .enumerate()
        .map(|(index, hop)| {
            let outgoing = route.hops.get(index + 1).unwrap_or(hop);
            WireHop {
                chan_id: hop.channel.number().to_string(),
                chan_capacity: hop.channel_capacity,
                amt_to_forward: outgoing.forward,
                fee: hop.fee,
                expiry: outgoing.timeout,
                amt_to_forward_msat: outgoing.forward_mtokens,
                fee_msat: hop.fee_mtokens,
                pub_key: hop.public_key.clone(),
            }
        })
        .collect();

    WireRoute {
        total_time_lock: route.timeout,
        total_fees: route.fee,
        total_amt: route.tokens,
        hops,
        total_fees_msat: route.fee_mtokens,
        total_amt_msat: route.mtokens,
    }
}

/// Reduce one HTLC attempt to an attempt event.
fn attempt_event(id: &str, sent: &AssembledRoute, attempt: WireAttempt) -> AttemptEvent {
    match attempt.status.as_str() {
        "SUCCEEDED" => {
            let route = match attempt.route.map(route_from_wire) {
                Some(Ok(route)) => route,
                Some(Err(err)) => return AttemptEvent::TransientError(err.to_string()),
                None => sent.clone(),
            };
            let secret = match attempt.preimage.as_deref().map(|p| B64.decode(p)) {
                Some(Ok(bytes)) => hex::encode(bytes),
                _ => return AttemptEvent::TransientError("succeeded without a preimage".into()),
            };
            AttemptEvent::Success(AttemptSuccess {
                id: id.to_string(),
                route,
                secret,
            })
        }
        "FAILED" => {
            let Some(failure) = attempt.failure else {
                let (code, message) = UNEXPECTED_FAILURE;
                return AttemptEvent::Failure(AttemptFailure::new(code, message));
            };
            let (code, message) = classify_failure(&failure.code);
            let channel = failure
                .channel_update
                .and_then(|update| parse_channel_number(&update.chan_id).ok())
                .or_else(|| {
                    sent.hops
                        .get(failure.failure_source_index)
                        .map(|hop| hop.channel)
                });
            let mut event = AttemptFailure::new(code, message);
            event.channel = channel;
            AttemptEvent::Failure(event)
        }
        other => AttemptEvent::TransientError(format!("unexpected attempt status {other:?}")),
    }
}

/// Ledger node client over the REST gateway
#[derive(Clone)]
pub struct LndRest {
    http: Client,
    base: Url,
    macaroon_hex: String,
    admission: AdmissionControl,
}

impl LndRest {
    pub fn new(
        base: Url,
        macaroon_hex: impl Into<String>,
        accept_invalid_certs: bool,
        admission: AdmissionControl,
    ) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .gzip(true)
            .build()
            .map_err(|e| LedgerError::Transport(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base,
            macaroon_hex: macaroon_hex.into(),
            admission,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        verb: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, LedgerError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| LedgerError::Transport(format!("{method} url: {e}")))?;

        let _permit = self.admission.acquire().await;
        let _timer = REQ_LATENCY
            .with_label_values(&[SERVICE, method])
            .start_timer();

        let result = self.send(method, verb, url, body).await;
        if result.is_err() {
            REQ_ERRORS.with_label_values(&[SERVICE, method]).inc();
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &'static str,
        verb: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, LedgerError> {
        let mut request = self
            .http
            .request(verb, url)
            .header(MACAROON_HEADER, &self.macaroon_hex);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method} send: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| format!("http {status}"));
            return Err(LedgerError::Provider(message));
        }

        resp.json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("{method} decode: {e}")))
    }

    async fn attempt_route(
        &self,
        id: &str,
        route: &AssembledRoute,
    ) -> AttemptEvent {
        let payment_hash = match hex::decode(id) {
            Ok(bytes) => B64.encode(bytes),
            Err(_) => return AttemptEvent::TransientError(format!("invalid payment hash {id:?}")),
        };
        let body = json!({
            "payment_hash": payment_hash,
            "route": route_to_wire(route),
        });

        match self
            .call::<WireAttempt>("SendToRouteV2", Method::POST, "v2/router/route/send", Some(body))
            .await
        {
            Ok(attempt) => attempt_event(id, route, attempt),
            Err(err) => AttemptEvent::TransientError(err.to_string()),
        }
    }
}

#[async_trait]
impl LedgerNode for LndRest {
    async fn get_info(&self) -> Result<WalletInfo, LedgerError> {
        let info: WireInfo = self
            .call("GetInfo", Method::GET, "v1/getinfo", None)
            .await?;
        Ok(WalletInfo {
            public_key: info.identity_pubkey,
            current_block_height: info.block_height,
        })
    }

    async fn get_channel(&self, id: ChannelId) -> Result<ChannelRecord, LedgerError> {
        let path = format!("v1/graph/edge/{}", id.number());
        let edge: RawEdge = match self.call("GetChanInfo", Method::GET, &path, None).await {
            Ok(edge) => edge,
            Err(LedgerError::Provider(message)) if message.contains(EDGE_NOT_FOUND) => {
                return Err(LedgerError::ChannelNotFound(id))
            }
            Err(LedgerError::Provider(message)) if message.contains(EDGE_ZOMBIE) => {
                return Err(LedgerError::Zombie(id))
            }
            Err(err) => return Err(err),
        };
        channel_edge_as_channel(&edge)
    }

    async fn describe_graph(&self) -> Result<RawGraph, LedgerError> {
        self.call("DescribeGraph", Method::GET, "v1/graph", None)
            .await
    }

    async fn query_routes(
        &self,
        request: &QueryRoutesRequest,
    ) -> Result<Vec<AssembledRoute>, LedgerError> {
        let path = format!("v1/graph/routes/{}/{}", request.target, request.tokens);
        let body = serde_json::to_value(query_body(request)?)
            .map_err(|e| LedgerError::Malformed(format!("query routes body: {e}")))?;

        let routes: WireRoutes = match self
            .call("QueryRoutes", Method::POST, &path, Some(body))
            .await
        {
            Ok(routes) => routes,
            Err(LedgerError::Provider(message)) => {
                return Err(match classify_no_path(&message) {
                    Some(reason) => LedgerError::NoPath(reason),
                    None => LedgerError::Provider(message),
                })
            }
            Err(err) => return Err(err),
        };

        routes.routes.into_iter().map(route_from_wire).collect()
    }

    async fn send_to_route(
        &self,
        request: SendToRouteRequest,
    ) -> Result<AttemptStream, LedgerError> {
        if let Some(timeout) = request.pathfinding_timeout {
            debug!(?timeout, "route execution gateway takes no pathfinding timeout");
        }

        let (tx, rx) = mpsc::channel(request.routes.len().max(1));
        let client = self.clone();
        tokio::spawn(async move {
            for route in &request.routes {
                if tx.is_closed() {
                    break;
                }
                let event = client.attempt_route(&request.id, route).await;
                let settled = matches!(event, AttemptEvent::Success(_));
                if tx.send(event).await.is_err() || settled {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn verify_channel_backup(&self, request: &BackupRequest) -> Result<(), LedgerError> {
        let backup = hex::decode(&request.backup)
            .map_err(|_| LedgerError::Malformed("channel backup is not hex".into()))?;
        let body = json!({
            "single_chan_backups": {
                "chan_backups": [{
                    "chan_point": {
                        "funding_txid_str": request.transaction_id,
                        "output_index": request.transaction_vout,
                    },
                    "chan_backup": B64.encode(backup),
                }]
            }
        });
        let _: serde_json::Value = self
            .call("VerifyChanBackup", Method::POST, "v1/channels/backup/verify", Some(body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::assembly::route_from_hops;
    use crate::router::exclusion::IgnoreEntry;
    use crate::router::routes::{Hop, HopPolicy};

    fn key(byte: u8) -> String {
        hex::encode([byte; 33])
    }

    fn wire_route() -> WireRoute {
        serde_json::from_value(json!({
            "total_time_lock": 700080,
            "total_fees": "1",
            "total_amt": "1001",
            "total_fees_msat": "1000",
            "total_amt_msat": "1001000",
            "hops": [
                {
                    "chan_id": "1099511693313",
                    "chan_capacity": "2000000",
                    "amt_to_forward": "1000",
                    "fee": "1",
                    "expiry": 700040,
                    "amt_to_forward_msat": "1000000",
                    "fee_msat": "1000",
                    "pub_key": key(1)
                },
                {
                    "chan_id": "2199023321089",
                    "chan_capacity": "2000000",
                    "amt_to_forward": "1000",
                    "expiry": 700040,
                    "amt_to_forward_msat": "1000000",
                    "pub_key": key(2)
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn wire_route_parses_into_assembled_route() {
        let route = route_from_wire(wire_route()).unwrap();

        assert_eq!(route.mtokens, 1_001_000);
        assert_eq!(route.fee_mtokens, 1_000);
        assert_eq!(route.timeout, 700_080);
        assert_eq!(route.hops[0].channel.to_string(), "1x1x1");
        assert_eq!(route.hops[1].fee_mtokens, 0);
        assert_eq!(route.hops[1].public_key, key(2));
    }

    #[test]
    fn wire_hops_shift_onto_arriving_amounts() {
        let route = route_from_wire(wire_route()).unwrap();

        assert_eq!(route.hops[0].forward_mtokens, 1_001_000);
        assert_eq!(route.hops[0].forward, 1_001);
        assert_eq!(route.hops[0].timeout, 700_080);
        assert_eq!(route.hops[1].forward_mtokens, 1_000_000);
        assert_eq!(route.hops[1].timeout, 700_040);
    }

    #[test]
    fn assembled_route_is_sent_with_outgoing_amounts() {
        let hops = [
            Hop {
                channel: Some(ChannelId::from_number(1_099_511_693_313)),
                public_key: key(1),
                channel_capacity: Some(2_000_000),
                policy: Some(HopPolicy {
                    base_fee_mtokens: Some(1_000),
                    fee_rate: Some(0),
                    cltv_delta: Some(40),
                }),
            },
            Hop {
                channel: Some(ChannelId::from_number(2_199_023_321_089)),
                public_key: key(2),
                channel_capacity: Some(2_000_000),
                policy: None,
            },
        ];
        let route = route_from_hops(&hops, 700_000, 40, 1_000_000).unwrap();

        let wire = route_to_wire(&route);

        assert_eq!(wire.total_amt_msat, 1_001_000);
        assert_eq!(wire.total_time_lock, 700_080);
        assert_eq!(wire.hops[0].amt_to_forward_msat, 1_000_000);
        assert_eq!(wire.hops[0].fee_msat, 1_000);
        assert_eq!(wire.hops[0].expiry, 700_040);
        assert_eq!(wire.hops[1].amt_to_forward_msat, 1_000_000);
        assert_eq!(wire.hops[1].fee_msat, 0);
        assert_eq!(wire.hops[1].expiry, 700_040);

        let back = route_from_wire(wire).unwrap();
        assert_eq!(back, route);
    }

    #[test]
    fn bad_hop_channel_is_malformed() {
        let mut wire = wire_route();
        wire.hops[0].chan_id = "x".into();
        assert!(matches!(route_from_wire(wire), Err(LedgerError::Malformed(_))));
        assert!(matches!(
            route_from_wire(WireRoute::default()),
            Err(LedgerError::Malformed(_))
        ));
    }

    #[test]
    fn exclusions_map_onto_wire_lists() {
        let id = ChannelId::from_number(77);
        let exclusions = ExclusionSet::from_entries(&[
            IgnoreEntry::channel(id),
            IgnoreEntry::edge(id, key(2), key(1)),
            IgnoreEntry::node(key(3)),
            IgnoreEntry {
                channel: None,
                from_public_key: Some(key(4)),
                to_public_key: Some(key(5)),
            },
        ]);
        let request = QueryRoutesRequest {
            tokens: 1_000,
            fee_limit: Some(10),
            final_cltv_delta: 40,
            exclusions,
            target: key(9),
            source: None,
        };

        let body = query_body(&request).unwrap();

        assert_eq!(body.ignored_edges.len(), 3);
        assert_eq!(
            body.ignored_edges[2],
            WireEdgeLocator {
                channel_id: "77".into(),
                direction_reverse: true,
            }
        );
        assert_eq!(body.ignored_nodes, vec![B64.encode([3u8; 33])]);
        assert_eq!(body.ignored_pairs[0].from, B64.encode([4u8; 33]));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["fee_limit"]["fixed"], "10");
        assert!(json.get("source_pub_key").is_none());
    }

    #[test]
    fn no_path_messages_are_classified() {
        assert_eq!(
            classify_no_path("unable to find a path to destination"),
            Some(NoPathReason::NoPathFound)
        );
        assert_eq!(
            classify_no_path("insufficient local balance"),
            Some(NoPathReason::InsufficientCapacity)
        );
        assert_eq!(
            classify_no_path("target not found"),
            Some(NoPathReason::TargetNotInNetwork)
        );
        assert_eq!(classify_no_path("permission denied"), None);
    }

    #[test]
    fn failure_codes_are_classified() {
        assert_eq!(
            classify_failure("INCORRECT_OR_UNKNOWN_PAYMENT_DETAILS"),
            (404, "UnknownPaymentHash")
        );
        assert_eq!(
            classify_failure("TEMPORARY_CHANNEL_FAILURE"),
            (503, "TemporaryChannelFailure")
        );
        assert_eq!(classify_failure("SOMETHING_NEW"), UNEXPECTED_FAILURE);
    }

    #[test]
    fn failed_attempt_is_attributed_to_a_channel() {
        let sent = route_from_wire(wire_route()).unwrap();
        let attempt: WireAttempt = serde_json::from_value(json!({
            "status": "FAILED",
            "failure": {"code": "FEE_INSUFFICIENT", "failure_source_index": 1}
        }))
        .unwrap();

        match attempt_event("aa", &sent, attempt) {
            AttemptEvent::Failure(failure) => {
                assert_eq!(failure.code, 503);
                assert_eq!(failure.message, "FeeInsufficient");
                assert_eq!(failure.channel, Some(sent.hops[1].channel));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn succeeded_attempt_carries_the_preimage() {
        let sent = route_from_wire(wire_route()).unwrap();
        let attempt: WireAttempt = serde_json::from_value(json!({
            "status": "SUCCEEDED",
            "preimage": B64.encode([7u8; 32]),
        }))
        .unwrap();

        match attempt_event("aa", &sent, attempt) {
            AttemptEvent::Success(success) => {
                assert_eq!(success.secret, hex::encode([7u8; 32]));
                assert_eq!(success.route, sent);
                assert_eq!(success.id, "aa");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
