//! The two pool search strategies.
//!
//! Both strategies draw from their own clone of the pool, so neither sees
//! the other's removals. A run probes the pool with
//! [`SecurityTree::range_search`], taking every hit, until the running
//! deficit is covered or the pool is empty.
//!
//! ## Probe windows
//!
//! | Strategy | First window | After a hit | After a miss |
//! |----------|--------------|-------------|--------------|
//! | Small-first | `[d, d*(1+t)]` | `[d', d'*(1+t)]` | `[0, min]` |
//! | Large-first | `[d, MAX]` | `[d', MAX]` | unchanged |
//!
//! `d` is the initial deficit, `d'` the remaining one, `t` the threshold.
//!
//! When a probe misses, the pool extremes force progress: if every value is
//! above the window the minimum is taken, if every value is below it the
//! maximum is taken.

use std::fmt;

use rust_decimal::Decimal;

use crate::tree::SecurityTree;
use crate::types::Security;

/// Which search a run used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Tight fit inside a tolerance band above the deficit
    SmallFirst,
    /// Smallest single security at or above the deficit
    LargeFirst,
}

impl Strategy {
    /// Upper bound of a probe window starting at `deficit`
    fn upper_bound(self, deficit: Decimal, threshold: Decimal) -> Decimal {
        match self {
            Strategy::SmallFirst => deficit
                .checked_mul(Decimal::ONE + threshold)
                .unwrap_or(Decimal::MAX),
            Strategy::LargeFirst => Decimal::MAX,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::SmallFirst => f.write_str("small-first"),
            Strategy::LargeFirst => f.write_str("large-first"),
        }
    }
}

/// Result of one strategy run against a working copy of the pool
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub strategy: Strategy,

    /// Securities drawn, in the order taken
    pub taken: Vec<Security>,

    /// Sum of `taken` market values
    pub total: Decimal,

    /// Did `total` reach the deficit
    pub covered: bool,

    /// The working copy with `taken` removed
    pub remaining: SecurityTree,
}

/// Run `strategy` for `needed` against a clone of `pool`.
///
/// # Arguments
///
/// * `strategy` - Which probe schedule to follow
/// * `pool` - The pool to search; never modified
/// * `needed` - Positive deficit to cover
/// * `threshold` - Tolerance band fraction, in [0, 1]
pub fn search(
    strategy: Strategy,
    pool: &SecurityTree,
    needed: Decimal,
    threshold: Decimal,
) -> SearchOutcome {
    let mut run = Run {
        working: pool.clone(),
        taken: Vec::new(),
        deficit: needed,
    };

    let mut min = needed;
    let mut max = strategy.upper_bound(needed, threshold);

    while !run.covered() {
        let mut found = false;
        if let Some(key) = run.working.range_search(min, max) {
            run.take(key);
            found = true;
            if run.covered() {
                break;
            }
        }

        let (Some(lowest), Some(highest)) = (run.working.minimum(), run.working.maximum()) else {
            // Pool exhausted with the deficit still open
            break;
        };
        let lowest_value = run.working.value_of(lowest).unwrap_or(Decimal::ZERO);
        let highest_value = run.working.value_of(highest).unwrap_or(Decimal::ZERO);

        if max < lowest_value {
            run.take(lowest);
        } else if min > highest_value {
            run.take(highest);
            found = true;
        }
        if run.covered() {
            break;
        }

        match (strategy, found) {
            (Strategy::SmallFirst, false) => {
                max = min;
                min = Decimal::ZERO;
            }
            (Strategy::SmallFirst, true) => {
                min = run.deficit;
                max = strategy.upper_bound(run.deficit, threshold);
            }
            (Strategy::LargeFirst, true) => {
                min = run.deficit;
                max = Decimal::MAX;
            }
            (Strategy::LargeFirst, false) => {}
        }
    }

    let covered = run.covered();
    let total = run.taken.iter().map(|s| s.market_value).sum();
    SearchOutcome {
        strategy,
        taken: run.taken,
        total,
        covered,
        remaining: run.working,
    }
}

struct Run {
    working: SecurityTree,
    taken: Vec<Security>,
    /// Still to cover; covered once zero or below
    deficit: Decimal,
}

impl Run {
    fn take(&mut self, key: usize) {
        if let Some(security) = self.working.remove(key) {
            self.deficit -= security.market_value;
            self.taken.push(security);
        }
    }

    #[inline]
    fn covered(&self) -> bool {
        self.deficit <= Decimal::ZERO
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
