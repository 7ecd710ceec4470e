// Route ranker - filters assembled routes by fee budget and orders them
// cheapest first
//
// Numan Thabit 2025 Nov

use crate::errors::{NoPathReason, RouterError};
use crate::router::routes::{AssembledRoute, RouteSelection};
use tracing::{debug, info};

/// Ranks candidate routes from every candidate path of one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteRanker {
    /// Maximum route fee in tokens.
    fee_budget: Option<u64>,
}

impl RouteRanker {
    pub fn new(fee_budget: Option<u64>) -> Self {
        Self { fee_budget }
    }

    /// Drop routes over budget and sort ascending by fee. Equal fees keep
    /// their candidate order.
    pub fn rank(&self, routes: Vec<AssembledRoute>) -> Vec<AssembledRoute> {
        let total = routes.len();
        let mut ranked: Vec<AssembledRoute> = routes
            .into_iter()
            .filter(|route| self.fee_budget.map_or(true, |budget| route.fee <= budget))
            .collect();
        ranked.sort_by_key(|route| route.fee_mtokens);

        debug!(
            candidates = total,
            within_budget = ranked.len(),
            fee_budget = ?self.fee_budget,
            "ranked assembled routes"
        );
        ranked
    }

    pub fn select(&self, routes: Vec<AssembledRoute>) -> Result<RouteSelection, RouterError> {
        let mut ranked = self.rank(routes);
        if ranked.is_empty() {
            return Err(RouterError::PathNotFound(NoPathReason::NoRouteFound));
        }

        let best = ranked.remove(0);
        info!(
            best_fee_mtokens = best.fee_mtokens,
            hops = best.hops.len(),
            alternatives = ranked.len(),
            "selected best route"
        );

        Ok(RouteSelection {
            route: best,
            alternatives: ranked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(fee_mtokens: u64, marker: u32) -> AssembledRoute {
        AssembledRoute {
            fee: fee_mtokens / 1_000,
            fee_mtokens,
            hops: vec![],
            mtokens: 1_000_000 + fee_mtokens,
            timeout: marker,
            tokens: (1_000_000 + fee_mtokens) / 1_000,
        }
    }

    #[test]
    fn drops_routes_over_budget_and_sorts_by_fee() {
        let routes = vec![route(9_000, 1), route(2_000, 2), route(12_000, 3), route(5_500, 4)];

        let ranked = RouteRanker::new(Some(9)).rank(routes);

        let fees: Vec<u64> = ranked.iter().map(|r| r.fee_mtokens).collect();
        assert_eq!(fees, vec![2_000, 5_500, 9_000]);
    }

    #[test]
    fn no_budget_keeps_everything() {
        let ranked = RouteRanker::new(None).rank(vec![route(3_000, 1), route(1_000, 2)]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].fee_mtokens, 1_000);
    }

    #[test]
    fn equal_fees_keep_candidate_order() {
        let ranked = RouteRanker::default().rank(vec![route(1_000, 1), route(1_000, 2), route(0, 3)]);
        let markers: Vec<u32> = ranked.iter().map(|r| r.timeout).collect();
        assert_eq!(markers, vec![3, 1, 2]);
    }

    #[test]
    fn select_splits_best_from_alternatives() {
        let selection = RouteRanker::default()
            .select(vec![route(3_000, 1), route(1_000, 2)])
            .unwrap();
        assert_eq!(selection.best_route().fee_mtokens, 1_000);
        assert_eq!(selection.alternatives.len(), 1);

        assert!(matches!(
            RouteRanker::new(Some(0)).select(vec![route(3_000, 1)]),
            Err(RouterError::PathNotFound(_))
        ));
    }
}
