// Ledger node module
// This file defines the seam to the remote ledger node that owns the channel
// graph, pathfinding and route execution
//
// Numan Thabit 2025 Nov

pub mod channel_id;
pub mod graph;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use channel_id::ChannelId;

use crate::errors::LedgerError;
use crate::router::routes::AssembledRoute;
use async_trait::async_trait;
use futures::stream::BoxStream;
use graph::RawGraph;
use types::{
    AttemptEvent, BackupRequest, ChannelRecord, QueryRoutesRequest, SendToRouteRequest,
    WalletInfo,
};

/// Push stream of attempt events; the stream ending is the End signal.
pub type AttemptStream = BoxStream<'static, AttemptEvent>;

/// Remote ledger node operations consumed by the router.
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Own public key and current chain height.
    async fn get_info(&self) -> Result<WalletInfo, LedgerError>;

    /// Unknown and zombie channels are reported as distinct errors.
    async fn get_channel(&self, id: ChannelId) -> Result<ChannelRecord, LedgerError>;

    async fn describe_graph(&self) -> Result<RawGraph, LedgerError>;

    /// Ordered candidate routes, or `LedgerError::NoPath` when none exists.
    async fn query_routes(
        &self,
        request: &QueryRoutesRequest,
    ) -> Result<Vec<AssembledRoute>, LedgerError>;

    /// Open a subscription that attempts the routes in order.
    async fn send_to_route(&self, request: SendToRouteRequest)
        -> Result<AttemptStream, LedgerError>;

    async fn verify_channel_backup(&self, request: &BackupRequest) -> Result<(), LedgerError>;
}
