// Transport module - clients for the remote ledger node
// This file exposes the REST gateway client implementing the ledger seam
//
// Numan Thabit 2025 Nov

pub mod rest;

pub use rest::LndRest;
