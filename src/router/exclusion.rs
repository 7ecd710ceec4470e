// Exclusion resolution
// This file turns caller ignore entries into the canonical exclusion set
// handed to backend pathfinding
//
// Numan Thabit 2025 Nov

use crate::ledger::{ChannelId, LedgerNode};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Something to avoid: a channel, a direction of a channel, a node or a node pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_public_key: Option<String>,
}

impl IgnoreEntry {
    pub fn channel(channel: ChannelId) -> Self {
        Self {
            channel: Some(channel),
            ..Default::default()
        }
    }

    pub fn node(public_key: impl Into<String>) -> Self {
        Self {
            from_public_key: Some(public_key.into()),
            ..Default::default()
        }
    }

    pub fn edge(channel: ChannelId, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            channel: Some(channel),
            from_public_key: Some(from.into()),
            to_public_key: Some(to.into()),
        }
    }

    /// A channel with exactly one side named needs the other side looked up.
    fn is_half_edge(&self) -> bool {
        self.channel.is_some() && (self.from_public_key.is_some() != self.to_public_key.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectedEdge {
    pub channel: ChannelId,
    pub from_public_key: String,
    pub to_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePair {
    pub from_public_key: String,
    pub to_public_key: String,
}

/// Immutable once built for a pathfinding request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    channels: BTreeSet<ChannelId>,
    edges: BTreeSet<DirectedEdge>,
    pairs: BTreeSet<NodePair>,
    nodes: BTreeSet<String>,
}

impl ExclusionSet {
    /// Partition fully qualified entries. Unresolved half edges are skipped.
    pub fn from_entries(entries: &[IgnoreEntry]) -> Self {
        let mut set = Self::default();
        for entry in entries {
            match (
                entry.channel,
                entry.from_public_key.clone(),
                entry.to_public_key.clone(),
            ) {
                (Some(channel), None, None) => {
                    set.channels.insert(channel);
                }
                (Some(channel), Some(from_public_key), Some(to_public_key)) => {
                    set.edges.insert(DirectedEdge {
                        channel,
                        from_public_key,
                        to_public_key,
                    });
                }
                (Some(_), _, _) => {}
                (None, Some(from_public_key), Some(to_public_key)) => {
                    set.pairs.insert(NodePair {
                        from_public_key,
                        to_public_key,
                    });
                }
                (None, Some(node), None) | (None, None, Some(node)) => {
                    set.nodes.insert(node);
                }
                (None, None, None) => {}
            }
        }
        set
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &DirectedEdge> {
        self.edges.iter()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &NodePair> {
        self.pairs.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.edges.is_empty() && self.pairs.is_empty() && self.nodes.is_empty()
    }
}

/// Qualify half edges through channel lookups. Unresolvable entries are dropped.
pub async fn resolve_exclusions(ledger: &dyn LedgerNode, ignore: &[IgnoreEntry]) -> Vec<IgnoreEntry> {
    join_all(ignore.iter().map(|entry| resolve_entry(ledger, entry)))
        .await
        .into_iter()
        .flatten()
        .collect()
}

async fn resolve_entry(ledger: &dyn LedgerNode, entry: &IgnoreEntry) -> Option<IgnoreEntry> {
    if !entry.is_half_edge() {
        return Some(entry.clone());
    }
    let channel = entry.channel?;

    let record = match ledger.get_channel(channel).await {
        Ok(record) => record,
        Err(err) => {
            debug!(channel = %channel, error = %err, "dropping ignore entry for unresolvable channel");
            return None;
        }
    };

    let [first, second] = record.policies.as_slice() else {
        debug!(channel = %channel, policies = record.policies.len(), "dropping ignore entry for malformed channel");
        return None;
    };

    let known = entry
        .from_public_key
        .as_deref()
        .or(entry.to_public_key.as_deref())?;
    let other = if first.public_key == known {
        &second.public_key
    } else if second.public_key == known {
        &first.public_key
    } else {
        debug!(channel = %channel, public_key = known, "dropping ignore entry for key not on channel");
        return None;
    };

    let (from, to) = match &entry.from_public_key {
        Some(from) => (from.clone(), other.clone()),
        None => (other.clone(), known.to_string()),
    };
    Some(IgnoreEntry::edge(channel, from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::ledger::testing::ScriptedLedger;
    use crate::ledger::types::{ChannelRecord, Policy};

    fn key(byte: u8) -> String {
        hex::encode([byte; 33])
    }

    fn channel(id: u64, a: u8, b: u8) -> ChannelRecord {
        ChannelRecord {
            id: ChannelId::from_number(id),
            capacity: 1_000_000,
            policies: vec![Policy::for_node(key(a)), Policy::for_node(key(b))],
            transaction_id: None,
            transaction_vout: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn unknown_channel_entry_is_dropped() {
        let ledger = ScriptedLedger::new(key(9), 100);
        let ignore = vec![IgnoreEntry {
            channel: Some(ChannelId::from_number(7)),
            from_public_key: Some(key(1)),
            to_public_key: None,
        }];

        let resolved = resolve_exclusions(&ledger, &ignore).await;
        assert!(resolved.is_empty());
        assert_eq!(ledger.channel_lookups(), 1);
    }

    #[tokio::test]
    async fn zombie_channel_entry_is_dropped() {
        let id = ChannelId::from_number(7);
        let ledger = ScriptedLedger::new(key(9), 100).with_channel_error(id, LedgerError::Zombie(id));
        let ignore = vec![IgnoreEntry {
            channel: Some(id),
            from_public_key: None,
            to_public_key: Some(key(1)),
        }];

        assert!(resolve_exclusions(&ledger, &ignore).await.is_empty());
    }

    #[tokio::test]
    async fn missing_side_comes_from_other_policy() {
        let ledger = ScriptedLedger::new(key(9), 100).with_channel(channel(5, 1, 2));
        let id = ChannelId::from_number(5);
        let ignore = vec![
            IgnoreEntry {
                channel: Some(id),
                from_public_key: Some(key(2)),
                to_public_key: None,
            },
            IgnoreEntry {
                channel: Some(id),
                from_public_key: None,
                to_public_key: Some(key(2)),
            },
        ];

        let resolved = resolve_exclusions(&ledger, &ignore).await;
        assert_eq!(
            resolved,
            vec![IgnoreEntry::edge(id, key(2), key(1)), IgnoreEntry::edge(id, key(1), key(2))]
        );
    }

    #[tokio::test]
    async fn qualified_entries_pass_through_without_lookup() {
        let ledger = ScriptedLedger::new(key(9), 100);
        let id = ChannelId::from_number(5);
        let ignore = vec![
            IgnoreEntry::channel(id),
            IgnoreEntry::edge(id, key(1), key(2)),
            IgnoreEntry::node(key(3)),
        ];

        let resolved = resolve_exclusions(&ledger, &ignore).await;
        assert_eq!(resolved, ignore);
        assert_eq!(ledger.channel_lookups(), 0);
    }

    #[test]
    fn entries_partition_into_sets() {
        let id = ChannelId::from_number(5);
        let set = ExclusionSet::from_entries(&[
            IgnoreEntry::channel(id),
            IgnoreEntry::edge(id, key(1), key(2)),
            IgnoreEntry::node(key(3)),
            IgnoreEntry {
                channel: None,
                from_public_key: Some(key(4)),
                to_public_key: Some(key(5)),
            },
        ]);

        assert_eq!(set.channels().collect::<Vec<_>>(), vec![&id]);
        assert_eq!(set.edges().count(), 1);
        assert_eq!(set.nodes().collect::<Vec<_>>(), vec![&key(3)]);
        assert_eq!(set.pairs().next().map(|p| p.to_public_key.clone()), Some(key(5)));
        assert!(ExclusionSet::from_entries(&[]).is_empty());
    }
}
