// Channel cache
// Per-request memoized channel lookups with a fallback onto private
// channels declared in caller route hints
//
// Numan Thabit 2025 Nov

use crate::errors::RouterError;
use crate::ledger::types::{ChannelRecord, Policy};
use crate::ledger::{ChannelId, LedgerNode};
use crate::router::routes::{HintHop, Hop, HopPolicy};
use std::collections::HashMap;
use tracing::debug;

/// Lives for a single route sourcing call and is never shared across calls.
#[derive(Debug, Default)]
pub struct ChannelCache {
    fetched: HashMap<ChannelId, ChannelRecord>,
    hinted: HashMap<ChannelId, ChannelRecord>,
}

/// A channel as used by one hop of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub record: ChannelRecord,
    /// Node the hop arrives at.
    pub destination: String,
}

impl ChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every hinted channel. The forwarding terms on a hint hop belong
    /// to the node the hop leaves from, which is the previous hop's node.
    pub fn with_hints(hints: &[Vec<HintHop>], tokens: u64) -> Self {
        let mut hinted = HashMap::new();
        for route in hints {
            let mut previous: Option<&str> = None;
            for hop in route {
                if let Some(id) = hop.channel {
                    let mut policies = Vec::with_capacity(2);
                    if let Some(from) = previous {
                        policies.push(Policy {
                            base_fee_mtokens: hop.base_fee_mtokens,
                            cltv_delta: hop.cltv_delta,
                            fee_rate: hop.fee_rate,
                            ..Policy::for_node(from)
                        });
                    }
                    policies.push(Policy::for_node(hop.public_key.as_str()));
                    hinted.insert(
                        id,
                        ChannelRecord {
                            id,
                            capacity: hop.channel_capacity.unwrap_or(tokens),
                            policies,
                            transaction_id: None,
                            transaction_vout: None,
                            updated_at: None,
                        },
                    );
                }
                previous = Some(hop.public_key.as_str());
            }
        }
        Self {
            fetched: HashMap::new(),
            hinted,
        }
    }

    pub fn cached(&self) -> usize {
        self.fetched.len()
    }

    pub async fn resolve(
        &mut self,
        ledger: &dyn LedgerNode,
        id: ChannelId,
    ) -> Result<ChannelRecord, RouterError> {
        if let Some(record) = self.fetched.get(&id) {
            return Ok(record.clone());
        }

        match ledger.get_channel(id).await {
            Ok(record) => {
                self.fetched.insert(id, record.clone());
                Ok(record)
            }
            Err(err) if err.is_not_found() => match self.hinted.get(&id) {
                Some(hint) => {
                    debug!(channel = %id, "channel unknown to graph; using route hint");
                    self.fetched.insert(id, hint.clone());
                    Ok(hint.clone())
                }
                None => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        }
    }
}

/// Attach to each hop the policy its destination advertises on the next
/// hop's channel. The final hop forwards nowhere and gets none.
pub fn hops_from_channels(channels: &[ResolvedChannel]) -> Vec<Hop> {
    channels
        .iter()
        .enumerate()
        .map(|(i, channel)| {
            let policy = channels.get(i + 1).and_then(|next| {
                let policy = next.record.policy_of(&channel.destination);
                if policy.is_none() {
                    debug!(
                        channel = %next.record.id,
                        public_key = %channel.destination,
                        "no forwarding policy for hop; charging zero fee"
                    );
                }
                policy.map(|p| HopPolicy {
                    base_fee_mtokens: p.base_fee_mtokens,
                    fee_rate: p.fee_rate,
                    cltv_delta: p.cltv_delta,
                })
            });
            Hop {
                channel: Some(channel.record.id),
                public_key: channel.destination.clone(),
                channel_capacity: Some(channel.record.capacity),
                policy,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::ledger::testing::ScriptedLedger;

    fn key(byte: u8) -> String {
        hex::encode([byte; 33])
    }

    fn record(id: u64, policies: Vec<Policy>) -> ChannelRecord {
        ChannelRecord {
            id: ChannelId::from_number(id),
            capacity: 500_000,
            policies,
            transaction_id: None,
            transaction_vout: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let ledger = ScriptedLedger::new(key(0), 100).with_channel(record(1, vec![]));
        let mut cache = ChannelCache::new();
        let id = ChannelId::from_number(1);

        let first = cache.resolve(&ledger, id).await.unwrap();
        let second = cache.resolve(&ledger, id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(ledger.channel_lookups(), 1);
        assert_eq!(cache.cached(), 1);
    }

    #[tokio::test]
    async fn unknown_hinted_channel_uses_hint_data() {
        let ledger = ScriptedLedger::new(key(0), 100);
        let private = ChannelId::from_number(42);
        let hints = vec![vec![
            HintHop::to_node(key(1)),
            HintHop {
                base_fee_mtokens: Some(1_000),
                channel: Some(private),
                cltv_delta: Some(40),
                fee_rate: Some(10),
                ..HintHop::to_node(key(2))
            },
        ]];
        let mut cache = ChannelCache::with_hints(&hints, 5_000);

        let resolved = cache.resolve(&ledger, private).await.unwrap();

        assert_eq!(resolved.capacity, 5_000);
        let owner = resolved.policy_of(&key(1)).unwrap();
        assert_eq!(owner.base_fee_mtokens, Some(1_000));
        assert_eq!(owner.fee_rate, Some(10));
        assert_eq!(owner.cltv_delta, Some(40));
        assert!(resolved.policy_of(&key(2)).is_some());

        let again = cache.resolve(&ledger, private).await.unwrap();
        assert_eq!(again, resolved);
        assert_eq!(ledger.channel_lookups(), 1);
    }

    #[tokio::test]
    async fn unknown_channel_without_hint_is_not_found() {
        let ledger = ScriptedLedger::new(key(0), 100);
        let mut cache = ChannelCache::new();

        let err = cache.resolve(&ledger, ChannelId::from_number(9)).await.unwrap_err();
        assert!(matches!(err, RouterError::NotFound(_)));
    }

    #[tokio::test]
    async fn backend_failure_is_not_masked_by_hint() {
        let private = ChannelId::from_number(42);
        let ledger = ScriptedLedger::new(key(0), 100)
            .with_channel_error(private, LedgerError::Transport("reset".into()));
        let hints = vec![vec![HintHop {
            channel: Some(private),
            ..HintHop::to_node(key(2))
        }]];
        let mut cache = ChannelCache::with_hints(&hints, 5_000);

        let err = cache.resolve(&ledger, private).await.unwrap_err();
        assert!(matches!(err, RouterError::BackendUnavailable(_)));
    }

    #[test]
    fn hop_is_billed_with_destination_outgoing_policy() {
        let forwarding = Policy {
            base_fee_mtokens: Some(1_000),
            fee_rate: Some(1),
            cltv_delta: Some(40),
            ..Policy::for_node(key(1))
        };
        let channels = vec![
            ResolvedChannel {
                record: record(1, vec![Policy::for_node(key(0)), Policy::for_node(key(1))]),
                destination: key(1),
            },
            ResolvedChannel {
                record: record(2, vec![forwarding, Policy::for_node(key(2))]),
                destination: key(2),
            },
        ];

        let hops = hops_from_channels(&channels);

        assert_eq!(hops.len(), 2);
        assert_eq!(
            hops[0].policy,
            Some(HopPolicy {
                base_fee_mtokens: Some(1_000),
                fee_rate: Some(1),
                cltv_delta: Some(40),
            })
        );
        assert_eq!(hops[1].policy, None);
        assert_eq!(hops[1].public_key, key(2));
        assert_eq!(hops[0].channel_capacity, Some(500_000));
    }
}
