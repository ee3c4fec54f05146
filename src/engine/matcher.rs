//! Request matcher: covers one customer's deficit from the pool.
//!
//! Runs both [`Strategy`] searches on independent clones, picks one, and
//! commits it by swapping the winner's working copy in as the pool.

use rust_decimal::Decimal;
use tracing::debug;

use crate::engine::search::{search, SearchOutcome, Strategy};
use crate::engine::ChangeLedger;
use crate::error::AllocationError;
use crate::tree::SecurityTree;
use crate::types::amount::whole_units;
use crate::types::{ChangeStatus, Customer};

/// Result of a successful [`match_request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// None when the customer needed nothing
    pub strategy: Option<Strategy>,

    /// Market value committed to the customer
    pub total: Decimal,

    /// Number of securities committed
    pub count: usize,
}

impl MatchResult {
    fn nothing_needed() -> Self {
        Self {
            strategy: None,
            total: Decimal::ZERO,
            count: 0,
        }
    }
}

/// Pick the strategy to commit, or None if neither covered the deficit.
///
/// A failed strategy never wins. When both cover, totals are compared in
/// whole units and the smaller wins; ties and an exact small-first match
/// go to small-first.
pub fn select(small: &SearchOutcome, large: &SearchOutcome, needed: Decimal) -> Option<Strategy> {
    match (small.covered, large.covered) {
        (false, false) => None,
        (true, false) => Some(Strategy::SmallFirst),
        (false, true) => Some(Strategy::LargeFirst),
        (true, true) => {
            if small.total == needed || whole_units(small.total) <= whole_units(large.total) {
                Some(Strategy::SmallFirst)
            } else {
                Some(Strategy::LargeFirst)
            }
        }
    }
}

/// Cover `customer`'s deficit from `pool` at `threshold`.
///
/// On success the chosen securities are removed from the pool, tagged
/// `Pledge`, assigned to the customer and logged in `ledger`. On failure
/// nothing is changed.
///
/// # Arguments
///
/// * `customer` - Request to cover; nothing happens unless underpledged
/// * `pool` - Unassigned securities
/// * `threshold` - Small-first tolerance band, in [0, 1]
/// * `ledger` - Receives one pledge record per committed security
///
/// # Example
///
/// ```
/// use pledge_engine::engine::{match_request, ChangeLedger, Strategy};
/// use pledge_engine::tree::SecurityTree;
/// use pledge_engine::types::{Customer, Security};
/// use rust_decimal::Decimal;
///
/// let mut pool: SecurityTree = [100, 250, 400]
///     .into_iter()
///     .zip(1..)
///     .map(|(v, t)| Security::with_value(t, Decimal::from(v)))
///     .collect();
/// let mut customer = Customer::with_balance(7, "ACME", Decimal::from(240));
/// let mut ledger = ChangeLedger::new();
///
/// let result = match_request(&mut customer, &mut pool, Decimal::new(5, 1), &mut ledger).unwrap();
///
/// assert_eq!(result.strategy, Some(Strategy::SmallFirst));
/// assert_eq!(result.total, Decimal::from(250));
/// assert_eq!(pool.len(), 2);
/// assert!(!customer.is_underpledged());
/// ```
pub fn match_request(
    customer: &mut Customer,
    pool: &mut SecurityTree,
    threshold: Decimal,
    ledger: &mut ChangeLedger,
) -> Result<MatchResult, AllocationError> {
    if threshold < Decimal::ZERO || threshold > Decimal::ONE {
        return Err(AllocationError::InvalidThreshold(threshold));
    }

    let needed = customer.needed();
    if needed <= Decimal::ZERO {
        return Ok(MatchResult::nothing_needed());
    }

    let small = search(Strategy::SmallFirst, pool, needed, threshold);
    let large = search(Strategy::LargeFirst, pool, needed, threshold);

    debug!(
        target: "matcher",
        pledge_code = customer.pledge_code,
        needed = %needed,
        threshold = %threshold,
        small_total = %small.total,
        small_covered = small.covered,
        large_total = %large.total,
        large_covered = large.covered,
        "Strategies evaluated"
    );

    let Some(strategy) = select(&small, &large, needed) else {
        debug!(
            target: "matcher",
            pledge_code = customer.pledge_code,
            needed = %needed,
            "Pool cannot cover request"
        );
        return Err(AllocationError::Insufficient {
            pledge_code: customer.pledge_code,
            needed,
            threshold,
        });
    };

    let winner = match strategy {
        Strategy::SmallFirst => small,
        Strategy::LargeFirst => large,
    };

    *pool = winner.remaining;
    let count = winner.taken.len();
    for mut security in winner.taken {
        security.change_status = ChangeStatus::Pledge;
        customer.pledge(security);
        if let Some(pledged) = customer.pledged.last() {
            ledger.record_pledge(pledged);
        }
    }

    debug!(
        target: "matcher",
        pledge_code = customer.pledge_code,
        strategy = %strategy,
        total = %winner.total,
        count,
        "Request covered"
    );

    Ok(MatchResult {
        strategy: Some(strategy),
        total: winner.total,
        count,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Security;
    use std::str::FromStr;

    fn pool(values: &[i64]) -> SecurityTree {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Security::with_value(i as u32 + 1, Decimal::from(v)))
            .collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn outcome(strategy: Strategy, total: &str, covered: bool) -> SearchOutcome {
        SearchOutcome {
            strategy,
            taken: Vec::new(),
            total: dec(total),
            covered,
            remaining: SecurityTree::new(),
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn test_select_failed_never_wins() {
        let needed = dec("100");
        let small = outcome(Strategy::SmallFirst, "50", false);
        let large = outcome(Strategy::LargeFirst, "120", true);
        assert_eq!(select(&small, &large, needed), Some(Strategy::LargeFirst));

        let small = outcome(Strategy::SmallFirst, "130", true);
        let large = outcome(Strategy::LargeFirst, "60", false);
        assert_eq!(select(&small, &large, needed), Some(Strategy::SmallFirst));

        let large = outcome(Strategy::LargeFirst, "60", false);
        let small = outcome(Strategy::SmallFirst, "90", false);
        assert_eq!(select(&small, &large, needed), None);
    }

    #[test]
    fn test_select_smaller_total() {
        let needed = dec("100");
        let small = outcome(Strategy::SmallFirst, "150", true);
        let large = outcome(Strategy::LargeFirst, "110", true);
        assert_eq!(select(&small, &large, needed), Some(Strategy::LargeFirst));

        let small = outcome(Strategy::SmallFirst, "105", true);
        assert_eq!(select(&small, &large, needed), Some(Strategy::SmallFirst));
    }

    #[test]
    fn test_select_tie_after_truncation() {
        let needed = dec("100");
        let small = outcome(Strategy::SmallFirst, "110.90", true);
        let large = outcome(Strategy::LargeFirst, "110.10", true);
        assert_eq!(select(&small, &large, needed), Some(Strategy::SmallFirst));
    }

    #[test]
    fn test_select_exact_match() {
        let needed = dec("100.5");
        let small = outcome(Strategy::SmallFirst, "100.5", true);
        let large = outcome(Strategy::LargeFirst, "100.6", true);
        assert_eq!(select(&small, &large, needed), Some(Strategy::SmallFirst));
    }

    // ========================================================================
    // Matching
    // ========================================================================

    #[test]
    fn test_match_tie_goes_small() {
        let mut pool = pool(&[100, 250, 400]);
        let mut customer = Customer::with_balance(1, "ACME", dec("240"));
        let mut ledger = ChangeLedger::new();

        let result = match_request(&mut customer, &mut pool, dec("0.5"), &mut ledger).unwrap();

        assert_eq!(result.strategy, Some(Strategy::SmallFirst));
        assert_eq!(result.total, dec("250"));
        assert_eq!(result.count, 1);
        assert_eq!(customer.pledged[0].market_value, dec("250"));
        assert_eq!(customer.pledged[0].change_status, ChangeStatus::Pledge);
        assert_eq!(customer.pledged[0].pledge_id, Some(1));
        assert_eq!(ledger.pledged.len(), 1);
        assert_eq!(pool.iter().map(|s| s.market_value).collect::<Vec<_>>(), vec![dec("100"), dec("400")]);
        assert!(pool.verify_invariants().is_ok());
    }

    #[test]
    fn test_match_large_first_wins() {
        let mut pool = pool(&[90, 160]);
        let mut customer = Customer::with_balance(1, "ACME", dec("100"));
        let mut ledger = ChangeLedger::new();

        let result = match_request(&mut customer, &mut pool, dec("0.5"), &mut ledger).unwrap();

        // Small-first draws 90 + 160; large-first draws 160 alone
        assert_eq!(result.strategy, Some(Strategy::LargeFirst));
        assert_eq!(result.total, dec("160"));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.iter().next().unwrap().market_value, dec("90"));
    }

    #[test]
    fn test_match_insufficient_leaves_state() {
        let mut pool = pool(&[50, 60]);
        let mut customer = Customer::with_balance(3, "ACME", dec("500"));
        let mut ledger = ChangeLedger::new();
        let before = pool.state_root().unwrap();

        let err = match_request(&mut customer, &mut pool, dec("0.5"), &mut ledger).unwrap_err();

        assert_eq!(
            err,
            AllocationError::Insufficient {
                pledge_code: 3,
                needed: dec("500"),
                threshold: dec("0.5"),
            }
        );
        assert_eq!(pool.state_root().unwrap(), before);
        assert!(customer.pledged.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_match_nothing_needed() {
        let mut pool = pool(&[10]);
        let mut customer = Customer::with_balance(1, "ACME", Decimal::ZERO);
        let mut ledger = ChangeLedger::new();

        let result = match_request(&mut customer, &mut pool, dec("0.5"), &mut ledger).unwrap();
        assert_eq!(result.strategy, None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_match_rejects_threshold() {
        let mut pool = pool(&[10]);
        let mut customer = Customer::with_balance(1, "ACME", dec("5"));
        let mut ledger = ChangeLedger::new();

        let err = match_request(&mut customer, &mut pool, dec("1.5"), &mut ledger).unwrap_err();
        assert_eq!(err, AllocationError::InvalidThreshold(dec("1.5")));
    }
}
