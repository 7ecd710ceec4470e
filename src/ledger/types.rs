// Ledger data model
// This file defines the records exchanged with the ledger node: channels,
// forwarding policies, pathfinding queries and payment attempt events
//
// Numan Thabit 2025 Nov

use crate::ledger::ChannelId;
use crate::router::exclusion::ExclusionSet;
use crate::router::routes::AssembledRoute;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Millitokens per token.
pub const MTOKENS_PER_TOKEN: u64 = 1_000;

/// Large value fields travel as decimal strings to avoid precision loss.
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(u64),
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StrOrNum::deserialize(deserializer)? {
            StrOrNum::Num(n) => Ok(n),
            StrOrNum::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }

    pub mod option {
        use super::StrOrNum;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            match Option::<StrOrNum>::deserialize(deserializer)? {
                None => Ok(None),
                Some(StrOrNum::Num(n)) => Ok(Some(n)),
                Some(StrOrNum::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
            }
        }
    }
}

/// A node's advertised forwarding terms for one direction of a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub base_fee_mtokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cltv_delta: Option<u32>,
    /// Parts per million.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub max_htlc_mtokens: Option<u64>,
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub min_htlc_mtokens: Option<u64>,
    pub public_key: String,
}

impl Policy {
    pub fn for_node(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: ChannelId,
    /// Tokens.
    pub capacity: u64,
    /// Keyed by the owning node's public key.
    pub policies: Vec<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_vout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ChannelRecord {
    pub fn policy_of(&self, public_key: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.public_key == public_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub public_key: String,
    pub current_block_height: u32,
}

/// One backend pathfinding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRoutesRequest {
    pub tokens: u64,
    pub fee_limit: Option<u64>,
    pub final_cltv_delta: u32,
    pub exclusions: ExclusionSet,
    pub target: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendToRouteRequest {
    /// Hex payment hash.
    pub id: String,
    pub routes: Vec<AssembledRoute>,
    pub pathfinding_timeout: Option<Duration>,
}

/// Structured failure of one attempt, attributable to a channel when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
}

impl AttemptFailure {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            channel: None,
        }
    }

    pub fn at_channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSuccess {
    /// Hex payment hash.
    pub id: String,
    /// The route as confirmed by the backend.
    pub route: AssembledRoute,
    /// Hex payment preimage.
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    Success(AttemptSuccess),
    Failure(AttemptFailure),
    TransientError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackupRequest {
    /// Hex encoded single channel backup.
    pub backup: String,
    pub transaction_id: String,
    pub transaction_vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupVerification {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub alias: String,
    pub color: String,
    pub public_key: String,
    pub sockets: Vec<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkGraph {
    pub channels: Vec<ChannelRecord>,
    pub nodes: Vec<GraphNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_accepts_string_or_numeric_amounts() {
        let p: Policy = serde_json::from_str(
            r#"{"base_fee_mtokens":"1000","fee_rate":1,"min_htlc_mtokens":5,"public_key":"aa"}"#,
        )
        .unwrap();
        assert_eq!(p.base_fee_mtokens, Some(1000));
        assert_eq!(p.min_htlc_mtokens, Some(5));
        assert_eq!(p.max_htlc_mtokens, None);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["base_fee_mtokens"], "1000");
        assert!(json.get("max_htlc_mtokens").is_none());
    }
}
