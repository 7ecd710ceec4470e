// Request validation module
// Validates route sourcing and payment requests before any backend call
//
// Numan Thabit 2025 Nov

use crate::errors::RouterError;
use crate::router::exclusion::IgnoreEntry;
use crate::router::execution::PayViaRoutesRequest;
use crate::router::source::GetRoutesRequest;

const PUBLIC_KEY_BYTES: usize = 33;
const PAYMENT_HASH_BYTES: usize = 32;

/// Validation result
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn into_result(self) -> Result<(), RouterError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(RouterError::Validation(self.errors.join("; ")))
        }
    }
}

pub fn is_public_key(key: &str) -> bool {
    matches!(hex::decode(key), Ok(bytes) if bytes.len() == PUBLIC_KEY_BYTES)
}

pub fn is_payment_hash(id: &str) -> bool {
    matches!(hex::decode(id), Ok(bytes) if bytes.len() == PAYMENT_HASH_BYTES)
}

fn validate_ignore(result: &mut ValidationResult, ignore: &[IgnoreEntry]) {
    for (index, entry) in ignore.iter().enumerate() {
        if entry.channel.is_none() && entry.from_public_key.is_none() && entry.to_public_key.is_none() {
            result.add_error(format!("ignore entry {index} names no channel or node"));
        }
        for key in [&entry.from_public_key, &entry.to_public_key].into_iter().flatten() {
            if !is_public_key(key) {
                result.add_error(format!("ignore entry {index} has invalid public key {key:?}"));
            }
        }
    }
}

/// Validate a route sourcing request
pub fn validate_route_request(req: &GetRoutesRequest) -> ValidationResult {
    let mut result = ValidationResult::new();

    // 1. Something to route towards
    if req.destination.is_none() && req.routes.is_empty() {
        result.add_error("expected destination or routes to find routes towards".to_string());
    }
    if let Some(destination) = &req.destination {
        if !is_public_key(destination) {
            result.add_error(format!("invalid destination public key {destination:?}"));
        }
    }

    // 2. Starting node overrides only apply to pure pathfinding
    if !req.routes.is_empty() && req.start.is_some() {
        result.add_error("expected no routes when specifying a starting public key".to_string());
    }
    if let Some(start) = &req.start {
        if !is_public_key(start) {
            result.add_error(format!("invalid start public key {start:?}"));
        }
    }

    // 3. Exclusions
    validate_ignore(&mut result, &req.ignore);

    // 4. Hint paths: an entry hop plus at most one private extension hop
    for (index, route) in req.routes.iter().enumerate() {
        let Some(first) = route.first() else {
            result.add_error(format!("route {index} has no hops"));
            continue;
        };
        if !is_public_key(&first.public_key) {
            result.add_error(format!("route {index} first hop has no valid public key"));
        }
        let extension = &route[1..];
        if extension.len() > 1 {
            result.add_error(format!("route {index} extends more than the last hop"));
        }
        for hop in extension {
            if hop.channel.is_none() {
                result.add_error(format!("route {index} extension hop has no channel"));
            }
            if !is_public_key(&hop.public_key) {
                result.add_error(format!("route {index} extension hop has invalid public key"));
            }
        }
    }

    result
}

/// Validate a pay via routes request
pub fn validate_payment_request(req: &PayViaRoutesRequest) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(id) = &req.id {
        if !is_payment_hash(id) {
            result.add_error(format!("expected hex payment hash id, got {id:?}"));
        }
    }

    if req.routes.is_empty() {
        result.add_error("expected routes to pay via".to_string());
    }

    if req
        .routes
        .iter()
        .any(|route| route.hops.is_empty() || route.hops.iter().any(|hop| hop.public_key.is_empty()))
    {
        result.add_error("expected public key in every route hop".to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ChannelId;
    use crate::router::routes::HintHop;

    fn key(byte: u8) -> String {
        hex::encode([byte; 33])
    }

    #[test]
    fn requires_destination_or_routes() {
        let result = validate_route_request(&GetRoutesRequest::default());
        assert!(!result.is_valid);
        assert!(matches!(result.into_result(), Err(RouterError::Validation(_))));
    }

    #[test]
    fn routes_conflict_with_start() {
        let req = GetRoutesRequest {
            routes: vec![vec![HintHop::to_node(key(1))]],
            start: Some(key(2)),
            ..Default::default()
        };
        assert!(!validate_route_request(&req).is_valid);
    }

    #[test]
    fn only_one_extension_hop_is_allowed() {
        let ext = |byte| HintHop {
            channel: Some(ChannelId::from_number(byte as u64)),
            ..HintHop::to_node(key(byte))
        };
        let req = GetRoutesRequest {
            destination: Some(key(3)),
            routes: vec![vec![HintHop::to_node(key(1)), ext(2), ext(3)]],
            ..Default::default()
        };
        let result = validate_route_request(&req);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("extends"));
    }

    #[test]
    fn ignore_entries_need_a_subject_and_valid_keys() {
        let req = GetRoutesRequest {
            destination: Some(key(3)),
            ignore: vec![
                IgnoreEntry::default(),
                IgnoreEntry::node("zz"),
                IgnoreEntry::node(key(4)),
            ],
            ..Default::default()
        };
        assert_eq!(validate_route_request(&req).errors.len(), 2);
    }

    #[test]
    fn payment_hash_must_be_32_bytes_of_hex() {
        assert!(is_payment_hash(&hex::encode([7u8; 32])));
        assert!(!is_payment_hash("beef"));
        assert!(!is_payment_hash("not hex"));
    }
}
