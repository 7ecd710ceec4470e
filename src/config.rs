// Configuration management module
// This file handles loading and parsing of configuration settings
// from environment variables
//
// Numan Thabit 2025 Nov

use crate::router::source::DEFAULT_FINAL_CLTV_DELTA;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

const DEFAULT_API_PORT: u16 = 8080;
const DEFAULT_MAX_INFLIGHT: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Ledger node REST gateway, e.g. https://127.0.0.1:8080
    pub lnd_rest_endpoint: Url,
    /// Hex-encoded macaroon sent with every ledger node call
    pub macaroon_hex: String,
    /// Accept the node's self-signed TLS certificate
    pub accept_invalid_certs: Option<bool>,
    /// Concurrency control
    pub max_inflight: Option<usize>,
    /// Ledger node calls started per second
    pub rate_per_sec: Option<u32>,
    /// HTTP API listen address (defaults 0.0.0.0:8080)
    pub api_addr: Option<SocketAddr>,
    /// Final CLTV delta when a request gives none
    pub final_cltv_delta: Option<u32>,
    /// Pathfinding timeout hint forwarded with payments
    pub pathfinding_timeout_ms: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::default())
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env.separator("__").try_parsing(true))
            .build()?;
        let app: Self = cfg.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<()> {
        if hex::decode(&self.macaroon_hex).is_err() {
            bail!("MACAROON_HEX must be hex encoded");
        }
        if !matches!(self.lnd_rest_endpoint.scheme(), "http" | "https") {
            bail!(
                "unsupported ledger node endpoint scheme: {}",
                self.lnd_rest_endpoint.scheme()
            );
        }
        Ok(())
    }

    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_API_PORT)))
    }

    pub fn max_inflight(&self) -> usize {
        self.max_inflight.unwrap_or(DEFAULT_MAX_INFLIGHT)
    }

    pub fn final_cltv_delta(&self) -> u32 {
        self.final_cltv_delta.unwrap_or(DEFAULT_FINAL_CLTV_DELTA)
    }

    pub fn pathfinding_timeout(&self) -> Option<Duration> {
        self.pathfinding_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn loads_with_defaults() {
        let cfg = AppConfig::from_env(env(&[
            ("LND_REST_ENDPOINT", "https://127.0.0.1:8080"),
            ("MACAROON_HEX", "0201036c6e64"),
            ("RATE_PER_SEC", "50"),
        ]))
        .unwrap();

        assert_eq!(cfg.rate_per_sec, Some(50));
        assert_eq!(cfg.max_inflight(), DEFAULT_MAX_INFLIGHT);
        assert_eq!(cfg.final_cltv_delta(), 40);
        assert_eq!(cfg.api_addr().port(), 8080);
        assert_eq!(cfg.pathfinding_timeout(), None);
    }

    #[test]
    fn rejects_non_hex_macaroon() {
        let err = AppConfig::from_env(env(&[
            ("LND_REST_ENDPOINT", "https://127.0.0.1:8080"),
            ("MACAROON_HEX", "not-a-macaroon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MACAROON_HEX"));
    }
}
