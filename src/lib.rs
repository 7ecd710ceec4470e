// Library root module for ln-router
// This file defines the public API and module structure for the ln-router library
// It exports route sourcing, assembly and payment execution over a ledger node
//
// Numan Thabit 2025 Nov

pub mod config;
pub mod control;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod router;
pub mod transport;
