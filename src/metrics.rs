// Metrics and observability module
// This file registers the upstream request and payment outcome metrics
// and renders the registry for scraping
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

pub static REQ_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "lnrouter_request_latency_seconds",
        "latency for ledger node calls",
        &["service", "method"]
    )
    .unwrap()
});

pub static REQ_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lnrouter_request_errors_total",
        "errors by ledger node call",
        &["service", "method"]
    )
    .unwrap()
});

pub static PAYMENT_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lnrouter_payment_outcomes_total",
        "terminal payment attempt outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Text exposition of the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
