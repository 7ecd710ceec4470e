// Route types
// This file defines hint hops supplied by callers, hops fed into assembly,
// fully quantified routes and the selection result handed back to callers
//
// Numan Thabit 2025 Nov

use crate::ledger::types::{decimal, MTOKENS_PER_TOKEN};
use crate::ledger::ChannelId;
use serde::{Deserialize, Serialize};

/// A caller supplied hop of a partial or full path, used for private channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintHop {
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub base_fee_mtokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_capacity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cltv_delta: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<u64>,
    /// Node at the far end of this hop.
    #[serde(default)]
    pub public_key: String,
}

impl HintHop {
    pub fn to_node(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            ..Default::default()
        }
    }
}

/// Forwarding terms billed for a hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HopPolicy {
    pub base_fee_mtokens: Option<u64>,
    /// Parts per million.
    pub fee_rate: Option<u64>,
    pub cltv_delta: Option<u32>,
}

/// Input to route assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub channel: Option<ChannelId>,
    pub public_key: String,
    pub channel_capacity: Option<u64>,
    /// Terms the node at `public_key` charges to forward onto the next hop.
    pub policy: Option<HopPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopResult {
    pub channel: ChannelId,
    pub channel_capacity: u64,
    pub fee: u64,
    #[serde(with = "decimal")]
    pub fee_mtokens: u64,
    pub forward: u64,
    #[serde(with = "decimal")]
    pub forward_mtokens: u64,
    pub public_key: String,
    /// Expiry block height.
    pub timeout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledRoute {
    pub fee: u64,
    #[serde(with = "decimal")]
    pub fee_mtokens: u64,
    pub hops: Vec<HopResult>,
    #[serde(with = "decimal")]
    pub mtokens: u64,
    /// Expiry block height of the first hop.
    pub timeout: u32,
    pub tokens: u64,
}

impl AssembledRoute {
    /// Build the aggregates from quantified hops and the amount delivered.
    pub fn from_hops(hops: Vec<HopResult>, target_mtokens: u64, final_timeout: u32) -> Self {
        let (mtokens, timeout) = hops
            .first()
            .map(|h| (h.forward_mtokens, h.timeout))
            .unwrap_or((target_mtokens, final_timeout));
        let fee_mtokens = mtokens.saturating_sub(target_mtokens);
        Self {
            fee: fee_mtokens / MTOKENS_PER_TOKEN,
            fee_mtokens,
            hops,
            mtokens,
            timeout,
            tokens: mtokens / MTOKENS_PER_TOKEN,
        }
    }
}

/// Route selection result
#[derive(Debug, Clone, Serialize)]
pub struct RouteSelection {
    pub route: AssembledRoute,
    pub alternatives: Vec<AssembledRoute>,
}

impl RouteSelection {
    pub fn best_route(&self) -> &AssembledRoute {
        &self.route
    }
}
