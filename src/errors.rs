// Error types and error handling module
// This file defines the backend error surface and the routing error
// taxonomy returned to callers of the router
//
// Numan Thabit 2025 Nov

use crate::ledger::types::AttemptFailure;
use crate::ledger::ChannelId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Backend answers that mean "no route exists" rather than "something broke".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoPathReason {
    NoPathFound,
    NoRouteFound,
    InsufficientCapacity,
    MaxHopsExceeded,
    TargetNotInNetwork,
}

impl fmt::Display for NoPathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoPathFound => "no path found",
            Self::NoRouteFound => "no route found",
            Self::InsufficientCapacity => "insufficient capacity",
            Self::MaxHopsExceeded => "max hops exceeded",
            Self::TargetNotInNetwork => "target not in network",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),
    #[error("channel {0} is marked as zombie")]
    Zombie(ChannelId),
    #[error("no path: {0}")]
    NoPath(NoPathReason),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Unknown and zombie channels are both absences for routing purposes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChannelNotFound(_) | Self::Zombie(_))
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("no path: {0}")]
    PathNotFound(NoPathReason),
    #[error("payment failed: {message}")]
    PaymentFailure {
        code: u16,
        message: String,
        failures: Vec<AttemptFailure>,
    },
    #[error("attempt stream ended without a success or a failure")]
    ProtocolViolation,
    #[error("request cancelled")]
    Cancelled,
}

impl RouterError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Numeric classification, mirrored onto HTTP status codes by the API.
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) | Self::PathNotFound(_) => 404,
            Self::BackendUnavailable(_) | Self::ProtocolViolation => 503,
            Self::PaymentFailure { code, .. } => *code,
            Self::Cancelled => 499,
        }
    }

    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::PaymentFailure { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl From<LedgerError> for RouterError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ChannelNotFound(_) | LedgerError::Zombie(_) => {
                Self::NotFound(err.to_string())
            }
            LedgerError::NoPath(reason) => Self::PathNotFound(reason),
            LedgerError::Transport(_) | LedgerError::Provider(_) | LedgerError::Malformed(_) => {
                Self::BackendUnavailable(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_onto_taxonomy() {
        let id = ChannelId::from_number(1);
        assert!(matches!(
            RouterError::from(LedgerError::Zombie(id)),
            RouterError::NotFound(_)
        ));
        assert!(matches!(
            RouterError::from(LedgerError::NoPath(NoPathReason::NoRouteFound)),
            RouterError::PathNotFound(NoPathReason::NoRouteFound)
        ));
        let err = RouterError::from(LedgerError::Malformed("routes".into()));
        assert!(matches!(err, RouterError::BackendUnavailable(_)));
        assert_eq!(err.code(), 503);
    }

    #[test]
    fn payment_failure_carries_its_own_code() {
        let err = RouterError::PaymentFailure {
            code: 404,
            message: "UnknownPaymentHash".into(),
            failures: vec![],
        };
        assert_eq!(err.code(), 404);
        assert!(err.failures().is_empty());
    }
}
