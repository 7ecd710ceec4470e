// Scripted ledger node
// In-memory LedgerNode used by tests: channels, pathfinding answers and
// attempt streams are scripted up front and every call is recorded
//
// Numan Thabit 2025 Nov

use super::graph::RawGraph;
use super::types::{
    AttemptEvent, BackupRequest, ChannelRecord, QueryRoutesRequest, SendToRouteRequest,
    WalletInfo,
};
use super::{AttemptStream, ChannelId, LedgerNode};
use crate::errors::LedgerError;
use crate::router::routes::AssembledRoute;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Flags the subscription as closed when the stream holding it is dropped.
struct SubscriptionGuard(Arc<AtomicBool>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct ScriptedLedger {
    info: WalletInfo,
    channels: HashMap<ChannelId, Result<ChannelRecord, LedgerError>>,
    routes: HashMap<String, Result<Vec<AssembledRoute>, LedgerError>>,
    graph: RawGraph,
    attempts: Vec<AttemptEvent>,
    hang_after_attempts: bool,
    backup_error: Option<String>,
    channel_lookups: AtomicUsize,
    route_queries: Mutex<Vec<QueryRoutesRequest>>,
    sent: Mutex<Vec<SendToRouteRequest>>,
    subscription_closed: Arc<AtomicBool>,
}

impl ScriptedLedger {
    pub fn new(public_key: impl Into<String>, current_block_height: u32) -> Self {
        Self {
            info: WalletInfo {
                public_key: public_key.into(),
                current_block_height,
            },
            channels: HashMap::new(),
            routes: HashMap::new(),
            graph: RawGraph::default(),
            attempts: Vec::new(),
            hang_after_attempts: false,
            backup_error: None,
            channel_lookups: AtomicUsize::new(0),
            route_queries: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            subscription_closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_channel(mut self, channel: ChannelRecord) -> Self {
        self.channels.insert(channel.id, Ok(channel));
        self
    }

    pub fn with_channel_error(mut self, id: ChannelId, err: LedgerError) -> Self {
        self.channels.insert(id, Err(err));
        self
    }

    pub fn with_routes(mut self, target: impl Into<String>, routes: Vec<AssembledRoute>) -> Self {
        self.routes.insert(target.into(), Ok(routes));
        self
    }

    pub fn with_route_error(mut self, target: impl Into<String>, err: LedgerError) -> Self {
        self.routes.insert(target.into(), Err(err));
        self
    }

    pub fn with_graph(mut self, graph: RawGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_attempts(mut self, events: Vec<AttemptEvent>) -> Self {
        self.attempts = events;
        self
    }

    /// Keep the attempt stream open after the scripted events.
    pub fn hanging(mut self) -> Self {
        self.hang_after_attempts = true;
        self
    }

    pub fn with_backup_error(mut self, err: impl Into<String>) -> Self {
        self.backup_error = Some(err.into());
        self
    }

    pub fn channel_lookups(&self) -> usize {
        self.channel_lookups.load(Ordering::SeqCst)
    }

    pub fn route_queries(&self) -> Vec<QueryRoutesRequest> {
        self.route_queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    pub fn sent_payments(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn subscription_closed(&self) -> bool {
        self.subscription_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerNode for ScriptedLedger {
    async fn get_info(&self) -> Result<WalletInfo, LedgerError> {
        Ok(self.info.clone())
    }

    async fn get_channel(&self, id: ChannelId) -> Result<ChannelRecord, LedgerError> {
        self.channel_lookups.fetch_add(1, Ordering::SeqCst);
        self.channels
            .get(&id)
            .cloned()
            .unwrap_or(Err(LedgerError::ChannelNotFound(id)))
    }

    async fn describe_graph(&self) -> Result<RawGraph, LedgerError> {
        Ok(self.graph.clone())
    }

    async fn query_routes(
        &self,
        request: &QueryRoutesRequest,
    ) -> Result<Vec<AssembledRoute>, LedgerError> {
        if let Ok(mut queries) = self.route_queries.lock() {
            queries.push(request.clone());
        }
        self.routes
            .get(&request.target)
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn send_to_route(
        &self,
        request: SendToRouteRequest,
    ) -> Result<AttemptStream, LedgerError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request);
        }
        let guard = SubscriptionGuard(self.subscription_closed.clone());
        let scripted = stream::iter(self.attempts.clone());
        let events = if self.hang_after_attempts {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        };
        Ok(events
            .map(move |event| {
                let _held = &guard;
                event
            })
            .boxed())
    }

    async fn verify_channel_backup(&self, _request: &BackupRequest) -> Result<(), LedgerError> {
        match &self.backup_error {
            Some(err) => Err(LedgerError::Provider(err.clone())),
            None => Ok(()),
        }
    }
}
