// Router module - route sourcing, assembly and payment execution plane
// This file wires exclusion resolution, the channel cache, route assembly,
// ranking and the payment executor behind the HTTP router
//
// Numan Thabit 2025 Nov

pub mod assembly;
pub mod cache;
pub mod exclusion;
pub mod execution;
pub mod routes;
pub mod selector;
pub mod source;
pub mod validation;

#[allow(clippy::module_inception)]
pub mod router;

pub use execution::PaymentExecutor;
pub use router::Router;
pub use routes::{AssembledRoute, HintHop, RouteSelection};
pub use selector::RouteRanker;
pub use source::RouteSource;
