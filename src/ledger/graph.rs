// Graph record conversion
// This file casts raw channel edge and node records reported by the ledger
// node into the channel data model used by the router
//
// Numan Thabit 2025 Nov

use crate::errors::LedgerError;
use crate::ledger::types::{decimal, ChannelRecord, GraphNode, NetworkGraph, Policy};
use crate::ledger::ChannelId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashSet;

const OUTPOINT_SEPARATOR: char = ':';

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPolicy {
    #[serde(default)]
    pub time_lock_delta: Option<u32>,
    #[serde(default, with = "decimal::option")]
    pub min_htlc: Option<u64>,
    #[serde(default, with = "decimal::option")]
    pub fee_base_msat: Option<u64>,
    #[serde(default, with = "decimal::option")]
    pub fee_rate_milli_msat: Option<u64>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, with = "decimal::option")]
    pub max_htlc_msat: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEdge {
    /// Packed numeric channel id, as a decimal string.
    pub channel_id: String,
    pub chan_point: String,
    #[serde(default)]
    pub last_update: i64,
    pub node1_pub: String,
    pub node2_pub: String,
    #[serde(with = "decimal")]
    pub capacity: u64,
    #[serde(default)]
    pub node1_policy: Option<RawPolicy>,
    #[serde(default)]
    pub node2_policy: Option<RawPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAddress {
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub last_update: i64,
    pub pub_key: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub addresses: Vec<RawAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

/// ISO-8601 with millisecond precision from epoch seconds.
pub fn iso_from_epoch(seconds: i64) -> Result<String, LedgerError> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| LedgerError::Malformed(format!("invalid update time {seconds}")))
}

fn policy_from_raw(raw: Option<&RawPolicy>, public_key: &str) -> Policy {
    let Some(raw) = raw else {
        return Policy::for_node(public_key);
    };
    Policy {
        base_fee_mtokens: raw.fee_base_msat,
        cltv_delta: raw.time_lock_delta,
        fee_rate: raw.fee_rate_milli_msat,
        is_disabled: Some(raw.disabled),
        max_htlc_mtokens: raw.max_htlc_msat,
        min_htlc_mtokens: raw.min_htlc,
        public_key: public_key.to_string(),
    }
}

pub fn parse_channel_number(raw: &str) -> Result<ChannelId, LedgerError> {
    raw.parse::<u64>()
        .map(ChannelId::from_number)
        .map_err(|_| LedgerError::Malformed(format!("invalid numeric channel id {raw:?}")))
}

/// Cast a raw channel edge as channel details.
pub fn channel_edge_as_channel(edge: &RawEdge) -> Result<ChannelRecord, LedgerError> {
    let id = parse_channel_number(&edge.channel_id)?;

    let (transaction_id, vout) = edge
        .chan_point
        .split_once(OUTPOINT_SEPARATOR)
        .ok_or_else(|| LedgerError::Malformed(format!("invalid outpoint {:?}", edge.chan_point)))?;
    let transaction_vout = vout
        .parse::<u32>()
        .map_err(|_| LedgerError::Malformed(format!("invalid outpoint index {vout:?}")))?;

    Ok(ChannelRecord {
        id,
        capacity: edge.capacity,
        policies: vec![
            policy_from_raw(edge.node1_policy.as_ref(), &edge.node1_pub),
            policy_from_raw(edge.node2_policy.as_ref(), &edge.node2_pub),
        ],
        transaction_id: Some(transaction_id.to_string()),
        transaction_vout: Some(transaction_vout),
        updated_at: Some(iso_from_epoch(edge.last_update)?),
    })
}

/// Full graph snapshot. Nodes that never announced or have no channel are left out.
pub fn network_graph(raw: &RawGraph) -> Result<NetworkGraph, LedgerError> {
    let channels = raw
        .edges
        .iter()
        .map(channel_edge_as_channel)
        .collect::<Result<Vec<_>, _>>()?;

    let has_channel: HashSet<&str> = raw
        .edges
        .iter()
        .flat_map(|e| [e.node1_pub.as_str(), e.node2_pub.as_str()])
        .collect();

    let nodes = raw
        .nodes
        .iter()
        .filter(|n| n.last_update != 0 && has_channel.contains(n.pub_key.as_str()))
        .map(|n| {
            Ok(GraphNode {
                alias: n.alias.clone(),
                color: n.color.clone(),
                public_key: n.pub_key.clone(),
                sockets: n.addresses.iter().map(|a| a.addr.clone()).collect(),
                updated_at: iso_from_epoch(n.last_update)?,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(NetworkGraph { channels, nodes })
}
