//! Relaxation controller: allocation passes, rollback and threshold decay.
//!
//! ## Flow
//!
//! ```text
//! allocate
//!   ├─ release_overpledged          (overage filter)
//!   ├─ run_allocation_pass(start)   ──ok──> Direct
//!   └─ defragment_and_repledge
//!        ├─ unpledge every customer
//!        └─ for t in start, start-step, ..., floor
//!             run_allocation_pass(t) ──ok──> Repledged
//!                                    ──err─> rolled back, next t
//! ```
//!
//! A pass is atomic: when any customer cannot be covered, every pledge
//! made during the pass goes back to the pool and its pledge records are
//! dropped from the ledger.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::RelaxationConfig;
use crate::directory::CustomerDirectory;
use crate::engine::{match_request, ChangeLedger};
use crate::error::AllocationError;
use crate::tree::SecurityTree;

/// Totals of one successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    /// Customers that received securities
    pub customers: usize,
    /// Securities pledged
    pub securities: usize,
    /// Market value pledged
    pub total: Decimal,
}

/// Successful defragmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepledgeOutcome {
    /// Threshold of the pass that succeeded
    pub threshold: Decimal,
    /// Passes run, the successful one included
    pub passes: usize,
}

/// How [`allocate`] covered the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// The first pass at the start threshold covered everyone
    Direct(PassSummary),
    /// Full unwind and decaying retry
    Repledged(RepledgeOutcome),
}

/// Run one pass over every underpledged customer at `threshold`.
///
/// Customers are visited in pledge code order. The first customer that
/// cannot be covered fails the pass; the pool, customers and pledge log are
/// then restored to their state before the pass.
pub fn run_allocation_pass(
    directory: &mut CustomerDirectory,
    pool: &mut SecurityTree,
    threshold: Decimal,
    ledger: &mut ChangeLedger,
) -> Result<PassSummary, AllocationError> {
    let mark = ledger.pledge_mark();
    let saved: Vec<(u32, usize)> = directory
        .iter()
        .map(|c| (c.pledge_code, c.pledged.len()))
        .collect();

    let mut summary = PassSummary::default();
    for pledge_code in directory.underpledged() {
        let Some(customer) = directory.get_mut(pledge_code) else {
            continue;
        };

        match match_request(customer, pool, threshold, ledger) {
            Ok(result) => {
                summary.customers += 1;
                summary.securities += result.count;
                summary.total += result.total;
            }
            Err(err) => {
                rollback_pass(directory, pool, ledger, &saved, mark);
                debug!(
                    target: "relaxation",
                    pledge_code,
                    threshold = %threshold,
                    "Allocation pass failed, rolled back"
                );
                return Err(err);
            }
        }
    }

    info!(
        target: "relaxation",
        threshold = %threshold,
        customers = summary.customers,
        securities = summary.securities,
        total = %summary.total,
        "Allocation pass complete"
    );
    Ok(summary)
}

fn rollback_pass(
    directory: &mut CustomerDirectory,
    pool: &mut SecurityTree,
    ledger: &mut ChangeLedger,
    saved: &[(u32, usize)],
    mark: usize,
) {
    for &(pledge_code, len) in saved {
        let Some(customer) = directory.get_mut(pledge_code) else {
            continue;
        };
        for mut security in customer.take_pledged_after(len) {
            security.release();
            pool.insert(security);
        }
    }
    ledger.discard_pledges_after(mark);
}

/// Release every customer pledged above `balance * overage_limit`.
///
/// Their securities return to the pool and are logged as unpledged.
/// Returns the number of customers released.
pub fn release_overpledged(
    directory: &mut CustomerDirectory,
    pool: &mut SecurityTree,
    ledger: &mut ChangeLedger,
    overage_limit: Decimal,
) -> usize {
    let mut released = 0;
    for customer in directory.iter_mut() {
        if customer.pledged.is_empty()
            || customer.over_under() <= customer.total_balance() * overage_limit
        {
            continue;
        }

        info!(
            target: "relaxation",
            pledge_code = customer.pledge_code,
            over_under = %customer.over_under(),
            balance = %customer.total_balance(),
            "Releasing overpledged customer"
        );
        for mut security in customer.take_pledged() {
            ledger.record_unpledge(&security);
            security.release();
            pool.insert(security);
        }
        released += 1;
    }
    released
}

/// Return every pledged security to the pool, logging each once.
///
/// Returns the number of securities released.
pub fn unpledge_all(
    directory: &mut CustomerDirectory,
    pool: &mut SecurityTree,
    ledger: &mut ChangeLedger,
) -> usize {
    let mut released = 0;
    for customer in directory.iter_mut() {
        for mut security in customer.take_pledged() {
            ledger.record_unpledge(&security);
            security.release();
            pool.insert(security);
            released += 1;
        }
    }
    released
}

/// Unwind all pledges, then retry passes with a decaying threshold.
///
/// # Arguments
///
/// * `directory` - Customers to cover
/// * `pool` - Unassigned securities; receives every released security
/// * `config` - Threshold schedule
/// * `ledger` - Receives the unpledge records and the final pledges
///
/// # Returns
///
/// The threshold of the successful pass and the number of passes run, or
/// [`AllocationError::Exhausted`] when the floor also failed.
pub fn defragment_and_repledge(
    directory: &mut CustomerDirectory,
    pool: &mut SecurityTree,
    config: &RelaxationConfig,
    ledger: &mut ChangeLedger,
) -> Result<RepledgeOutcome, AllocationError> {
    let released = unpledge_all(directory, pool, ledger);
    info!(
        target: "relaxation",
        released,
        pool = pool.len(),
        "Pledges cleared for repledge"
    );

    let mut passes = 0;
    for threshold in config.schedule() {
        passes += 1;
        match run_allocation_pass(directory, pool, threshold, ledger) {
            Ok(_) => {
                info!(
                    target: "relaxation",
                    threshold = %threshold,
                    passes,
                    "Repledge succeeded"
                );
                return Ok(RepledgeOutcome { threshold, passes });
            }
            Err(AllocationError::Insufficient { .. }) => continue,
            Err(err) => return Err(err),
        }
    }

    warn!(
        target: "relaxation",
        floor = %config.floor,
        passes,
        needed = %directory.total_needed(),
        available = %pool.sum(),
        "Insufficient securities available"
    );
    Err(AllocationError::Exhausted { floor: config.floor })
}

/// Ordinary update: overage filter, one pass at the start threshold, and a
/// full repledge if that pass fails.
pub fn allocate(
    directory: &mut CustomerDirectory,
    pool: &mut SecurityTree,
    config: &RelaxationConfig,
    ledger: &mut ChangeLedger,
) -> Result<AllocationOutcome, AllocationError> {
    release_overpledged(directory, pool, ledger, config.overage_limit);

    match run_allocation_pass(directory, pool, config.start_threshold, ledger) {
        Ok(summary) => Ok(AllocationOutcome::Direct(summary)),
        Err(AllocationError::Insufficient { pledge_code, .. }) => {
            info!(
                target: "relaxation",
                pledge_code,
                "Direct pass failed, repledging"
            );
            defragment_and_repledge(directory, pool, config, ledger).map(AllocationOutcome::Repledged)
        }
        Err(err) => Err(err),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
