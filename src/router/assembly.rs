// Route assembly
// Quantifies an ordered hop list into per-hop forward amounts, fees and
// expiry heights by walking backward from the destination
//
// Numan Thabit 2025 Nov

use crate::errors::RouterError;
use crate::ledger::types::MTOKENS_PER_TOKEN;
use crate::router::routes::{AssembledRoute, Hop, HopPolicy, HopResult};

const FEE_RATE_DENOMINATOR: u128 = 1_000_000;

/// Fee for forwarding `mtokens` under `policy`: base + floor(amount * rate / 1e6).
pub fn forwarding_fee(mtokens: u64, policy: &HopPolicy) -> Option<u64> {
    let proportional = (mtokens as u128) * (policy.fee_rate.unwrap_or(0) as u128) / FEE_RATE_DENOMINATOR;
    let fee = (policy.base_fee_mtokens.unwrap_or(0) as u128).checked_add(proportional)?;
    u64::try_from(fee).ok()
}

/// Assemble a route delivering `mtokens` to the last hop's node.
///
/// Hops are ordered origin to destination. Every hop but the last charges
/// its policy's fee and CLTV delta, accumulating toward the origin; a hop
/// without a policy charges nothing.
pub fn route_from_hops(
    hops: &[Hop],
    height: u32,
    final_cltv_delta: u32,
    mtokens: u64,
) -> Result<AssembledRoute, RouterError> {
    if hops.is_empty() {
        return Err(RouterError::validation("expected hops to assemble a route from"));
    }

    let final_timeout = height
        .checked_add(final_cltv_delta)
        .ok_or_else(|| RouterError::validation("final expiry height overflows"))?;

    let mut carried_mtokens = mtokens;
    let mut carried_timeout = final_timeout;
    let mut results = Vec::with_capacity(hops.len());

    for (index, hop) in hops.iter().enumerate().rev() {
        let channel = hop.channel.ok_or_else(|| {
            RouterError::validation(format!("expected channel for hop {index} to {}", hop.public_key))
        })?;

        let mut fee_mtokens = 0;
        if index + 1 < hops.len() {
            let policy = hop.policy.unwrap_or_default();
            fee_mtokens = forwarding_fee(carried_mtokens, &policy)
                .ok_or_else(|| RouterError::validation("hop fee overflows"))?;
            carried_mtokens = carried_mtokens
                .checked_add(fee_mtokens)
                .ok_or_else(|| RouterError::validation("route amount overflows"))?;
            carried_timeout = carried_timeout
                .checked_add(policy.cltv_delta.unwrap_or(0))
                .ok_or_else(|| RouterError::validation("route expiry overflows"))?;
        }

        results.push(HopResult {
            channel,
            channel_capacity: hop.channel_capacity.unwrap_or(0),
            fee: fee_mtokens / MTOKENS_PER_TOKEN,
            fee_mtokens,
            forward: carried_mtokens / MTOKENS_PER_TOKEN,
            forward_mtokens: carried_mtokens,
            public_key: hop.public_key.clone(),
            timeout: carried_timeout,
        });
    }
    results.reverse();

    Ok(AssembledRoute::from_hops(results, mtokens, final_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ChannelId;

    const HEIGHT: u32 = 600_000;

    fn hop(channel: u64, policy: Option<HopPolicy>) -> Hop {
        Hop {
            channel: Some(ChannelId::from_number(channel)),
            public_key: format!("02{channel:064x}"),
            channel_capacity: Some(1_000_000),
            policy,
        }
    }

    fn policy(base: u64, rate: u64, cltv: u32) -> Option<HopPolicy> {
        Some(HopPolicy {
            base_fee_mtokens: Some(base),
            fee_rate: Some(rate),
            cltv_delta: Some(cltv),
        })
    }

    #[test]
    fn direct_route_charges_nothing() {
        let route = route_from_hops(&[hop(1, policy(5_000, 100, 144))], HEIGHT, 40, 250_000).unwrap();

        assert_eq!(route.hops.len(), 1);
        assert_eq!(route.hops[0].forward_mtokens, 250_000);
        assert_eq!(route.hops[0].fee_mtokens, 0);
        assert_eq!(route.hops[0].timeout, HEIGHT + 40);
        assert_eq!(route.fee_mtokens, 0);
        assert_eq!(route.mtokens, 250_000);
        assert_eq!(route.timeout, HEIGHT + 40);
    }

    #[test]
    fn two_hop_route_bills_first_hop_policy() {
        let hops = [hop(1, policy(1_000, 0, 40)), hop(2, None)];

        let route = route_from_hops(&hops, HEIGHT, 40, 1_000_000).unwrap();

        assert_eq!(route.hops[0].forward_mtokens, 1_001_000);
        assert_eq!(route.hops[0].fee_mtokens, 1_000);
        assert_eq!(route.hops[0].timeout, HEIGHT + 80);
        assert_eq!(route.hops[1].forward_mtokens, 1_000_000);
        assert_eq!(route.hops[1].timeout, HEIGHT + 40);
        assert_eq!(route.fee_mtokens, 1_000);
        assert_eq!(route.fee, 1);
        assert_eq!(route.mtokens, 1_001_000);
        assert_eq!(route.tokens, 1_001);
        assert_eq!(route.timeout, HEIGHT + 80);
    }

    #[test]
    fn proportional_fee_compounds_toward_origin() {
        let hops = [
            hop(1, policy(1_000, 1_000, 10)),
            hop(2, policy(0, 2_000, 20)),
            hop(3, None),
        ];

        let route = route_from_hops(&hops, HEIGHT, 9, 1_000_000).unwrap();

        // 1_000_000 * 2000 / 1e6 = 2_000, then 1_000 + 1_002_000 * 1000 / 1e6 = 2_002
        assert_eq!(route.hops[1].fee_mtokens, 2_000);
        assert_eq!(route.hops[1].forward_mtokens, 1_002_000);
        assert_eq!(route.hops[0].fee_mtokens, 2_002);
        assert_eq!(route.hops[0].forward_mtokens, 1_004_002);
        assert_eq!(route.fee_mtokens, 4_002);
        assert_eq!(route.timeout, HEIGHT + 9 + 20 + 10);
    }

    #[test]
    fn forwards_and_expiries_never_increase_toward_destination() {
        let policies = [(0, 0, 0), (1, 1, 1), (1_000, 0, 40), (0, 5_000, 144), (250, 99, 18)];
        for length in 1..=policies.len() {
            let hops: Vec<Hop> = (0..length)
                .map(|i| {
                    let (base, rate, cltv) = policies[i];
                    hop(i as u64 + 1, policy(base, rate, cltv))
                })
                .collect();

            let route = route_from_hops(&hops, HEIGHT, 40, 123_456_789).unwrap();

            for pair in route.hops.windows(2) {
                assert!(pair[0].forward_mtokens >= pair[1].forward_mtokens);
                assert!(pair[0].timeout >= pair[1].timeout);
            }
            assert_eq!(route.hops.last().map(|h| h.forward_mtokens), Some(123_456_789));
        }
    }

    #[test]
    fn missing_policy_fields_charge_zero() {
        let partial = Some(HopPolicy {
            base_fee_mtokens: None,
            fee_rate: Some(0),
            cltv_delta: None,
        });
        let route = route_from_hops(&[hop(1, partial), hop(2, None)], HEIGHT, 40, 10_000).unwrap();

        assert_eq!(route.fee_mtokens, 0);
        assert_eq!(route.timeout, HEIGHT + 40);
    }

    #[test]
    fn hop_without_channel_is_rejected() {
        let mut unresolved = hop(1, None);
        unresolved.channel = None;

        assert!(matches!(
            route_from_hops(&[unresolved], HEIGHT, 40, 1),
            Err(RouterError::Validation(_))
        ));
        assert!(matches!(
            route_from_hops(&[], HEIGHT, 40, 1),
            Err(RouterError::Validation(_))
        ));
    }

    #[test]
    fn fee_is_floored() {
        let fee = forwarding_fee(999, &HopPolicy {
            base_fee_mtokens: Some(1),
            fee_rate: Some(1_000),
            cltv_delta: None,
        });
        assert_eq!(fee, Some(1));
    }
}
