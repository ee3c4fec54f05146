//! End-to-end allocation scenarios.
//!
//! Each scenario builds a directory and a pool, runs the controller and
//! checks the pool, the customers and the change ledger afterwards.

use std::str::FromStr;

use pledge_engine::engine::{match_request, Strategy};
use pledge_engine::{
    allocate, defragment_and_repledge, run_allocation_pass, AllocationError, AllocationOutcome,
    ChangeLedger, ChangeStatus, Customer, CustomerDirectory, ImportState, PledgeSession,
    RelaxationConfig, Security, SecurityTree,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn pool(values: &[i64]) -> SecurityTree {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Security::with_value(i as u32 + 1, Decimal::from(v)))
        .collect()
}

fn directory(balances: &[(u32, i64)]) -> CustomerDirectory {
    let mut directory = CustomerDirectory::new();
    for &(code, balance) in balances {
        directory.insert(Customer::with_balance(code, "CUSTOMER", Decimal::from(balance)));
    }
    directory
}

fn pool_values(pool: &SecurityTree) -> Vec<Decimal> {
    pool.iter().map(|s| s.market_value).collect()
}

/// Securities in the pool plus securities pledged to customers
fn securities_held(directory: &CustomerDirectory, pool: &SecurityTree) -> usize {
    pool.len() + directory.iter().map(|c| c.pledged.len()).sum::<usize>()
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Pool {100, 250, 400}, need 240: both strategies find 250, small-first
/// wins the tie.
#[test]
fn scenario_tie_goes_to_small_first() {
    let mut pool = pool(&[100, 250, 400]);
    let mut customer = Customer::with_balance(1, "CITY", dec("240"));
    let mut ledger = ChangeLedger::new();

    let result = match_request(&mut customer, &mut pool, dec("0.5"), &mut ledger).unwrap();

    assert_eq!(result.strategy, Some(Strategy::SmallFirst));
    assert_eq!(result.total, dec("250"));
    assert_eq!(customer.pledged.len(), 1);
    assert_eq!(customer.pledged[0].market_value, dec("250"));
    assert_eq!(pool_values(&pool), vec![dec("100"), dec("400")]);
    pool.verify_invariants().unwrap();
}

/// Pool {50, 60}, need 500: every pass fails and the controller gives up
/// at the floor.
#[test]
fn scenario_insufficient_pool() {
    let mut directory = directory(&[(1, 500)]);
    let mut pool = pool(&[50, 60]);
    let mut ledger = ChangeLedger::new();
    let config = RelaxationConfig::default();

    let err = run_allocation_pass(&mut directory, &mut pool, config.start_threshold, &mut ledger)
        .unwrap_err();
    assert!(matches!(err, AllocationError::Insufficient { pledge_code: 1, .. }));

    let err = allocate(&mut directory, &mut pool, &config, &mut ledger).unwrap_err();
    assert_eq!(err, AllocationError::Exhausted { floor: Decimal::ZERO });

    assert_eq!(pool_values(&pool), vec![dec("50"), dec("60")]);
    assert!(directory.get(1).unwrap().pledged.is_empty());
    assert!(ledger.is_empty());
}

/// Two customers needing 100 and 150 share {90, 160}. The first customer's
/// earlier 160 is over the 50% limit and must be released before the pass.
#[test]
fn scenario_overage_release() {
    let mut directory = directory(&[(1, 100)]);
    let mut pool = pool(&[90, 160]);
    let mut ledger = ChangeLedger::new();
    let config = RelaxationConfig::default();

    // Alone, customer 1 gets 160 from large-first; small-first would draw 90 and 160
    let outcome = allocate(&mut directory, &mut pool, &config, &mut ledger).unwrap();
    assert!(matches!(outcome, AllocationOutcome::Direct(_)));
    assert_eq!(directory.get(1).unwrap().pledged[0].market_value, dec("160"));
    assert_eq!(directory.get(1).unwrap().over_under(), dec("60"));

    directory.insert(Customer::with_balance(2, "COUNTY", dec("150")));
    let result = allocate(&mut directory, &mut pool, &config, &mut ledger);

    assert!(!ledger.unpledged.is_empty());
    assert_eq!(ledger.unpledged.len(), 1);
    assert_eq!(ledger.unpledged[0].market_value, dec("160"));
    assert_eq!(ledger.unpledged[0].change_status, ChangeStatus::Unpledge);

    // {90, 160} cannot be split to cover 100 and 150
    assert_eq!(result, Err(AllocationError::Exhausted { floor: Decimal::ZERO }));
    assert_eq!(securities_held(&directory, &pool), 2);
    assert_eq!(pool.len(), 2);
}

/// From a fully covered state, repledging twice succeeds on the first pass
/// both times.
#[test]
fn repledge_is_idempotent() {
    let mut directory = directory(&[(1, 240), (2, 90), (3, 380)]);
    let mut pool = pool(&[100, 250, 400, 75, 30, 20]);
    let mut ledger = ChangeLedger::new();
    let config = RelaxationConfig::default();

    allocate(&mut directory, &mut pool, &config, &mut ledger).unwrap();
    assert!(directory.underpledged().is_empty());

    let first = defragment_and_repledge(&mut directory, &mut pool, &config, &mut ledger).unwrap();
    let root = pool.state_root().unwrap();
    let second = defragment_and_repledge(&mut directory, &mut pool, &config, &mut ledger).unwrap();

    assert_eq!(first.passes, 1);
    assert_eq!(second.passes, 1);
    assert_eq!(first.threshold, config.start_threshold);
    assert_eq!(pool.state_root().unwrap(), root);
    assert!(directory.underpledged().is_empty());
}

/// Allocating, then repledging twice, in one session logs exactly what a
/// single run logs: ticket 2 pledged once, nothing unpledged.
#[test]
fn session_reruns_keep_single_run_logs() {
    let import = || ImportState::new(directory(&[(1, 240)]), pool(&[100, 250, 400]), ChangeLedger::new());

    let mut single = PledgeSession::new(import(), RelaxationConfig::default());
    single.allocate().unwrap();

    let mut session = PledgeSession::new(import(), RelaxationConfig::default());
    session.allocate().unwrap();
    session.repledge().unwrap();
    session.repledge().unwrap();

    let ledger = session.ledger();
    assert!(ledger.unpledged.is_empty());
    assert_eq!(ledger.pledged.len(), 1);
    assert_eq!(ledger.pledged[0].ticket, 2);
    assert_eq!(ledger.pledged[0].change_status, ChangeStatus::Pledge);
    assert_eq!(ledger, single.ledger());
    assert_eq!(session.pool().state_root().unwrap(), single.pool().state_root().unwrap());
    assert_eq!(
        session.directory().get(1).unwrap().pledged,
        single.directory().get(1).unwrap().pledged
    );
}

/// A pass that fails part way leaves no trace.
#[test]
fn failed_pass_is_atomic() {
    let mut directory = directory(&[(1, 100), (2, 90), (3, 1_000)]);
    let mut pool = pool(&[120, 95, 40, 300]);
    let mut ledger = ChangeLedger::new();
    let root = pool.state_root().unwrap();

    let err = run_allocation_pass(&mut directory, &mut pool, dec("0.5"), &mut ledger).unwrap_err();

    assert!(matches!(err, AllocationError::Insufficient { pledge_code: 3, .. }));
    assert_eq!(pool.state_root().unwrap(), root);
    assert!(directory.iter().all(|c| c.pledged.is_empty()));
    assert!(ledger.is_empty());
    pool.verify_invariants().unwrap();
}

/// Import routing feeds the pool and pre-existing pledges.
#[test]
fn import_then_allocate() {
    let mut directory = CustomerDirectory::new();
    directory
        .load_row(&["7", "1", "CITY", "", "100", "0.1%", "NOW", "MUNI", "500.00"])
        .unwrap();
    directory
        .load_row(&["7", "1", "CITY", "", "101", "0.1%", "MM", "MUNI", "250.00"])
        .unwrap();

    let mut pool = SecurityTree::new();
    let mut ledger = ChangeLedger::new();
    let rows = [
        ["INV", "A1", "1", "2030-01-01", "7", "CITY", "0", "300", "300.00", "AGY", "A"],
        ["INV", "A2", "2", "2030-01-01", "8", "GONE", "0", "400", "400.00", "AGY", "B"],
        ["INV", "A3", "3", "2030-01-01", "", "", "0", "500", "500.00", "AGY", "C"],
    ];
    for row in &rows {
        let security = Security::from_fields(&row[..]).unwrap();
        directory.place_security(security, &mut pool, &mut ledger);
    }

    assert_eq!(directory.get(7).unwrap().needed(), dec("450"));
    assert_eq!(ledger.unpledged.len(), 1);
    assert_eq!(pool.len(), 2);

    // Needs 450 from {400, 500}: only 500 is in the band
    allocate(&mut directory, &mut pool, &RelaxationConfig::default(), &mut ledger).unwrap();
    let customer = directory.get(7).unwrap();
    assert!(!customer.is_underpledged());
    assert_eq!(customer.pledged.len(), 2);
    assert_eq!(customer.pledged[1].market_value, dec("500"));
    assert_eq!(ledger.pledged.len(), 1);
    assert_eq!(pool_values(&pool), vec![dec("400")]);
}

/// Random books: securities are conserved, pool stays valid, and success
/// means nobody is left underpledged.
#[test]
fn random_books_conserve_securities() {
    let config = RelaxationConfig::default();

    for seed in 0..40u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let customer_count = rng.gen_range(1..=6);
        let security_count = rng.gen_range(1..=30);

        let balances: Vec<(u32, i64)> = (1..=customer_count)
            .map(|code| (code, rng.gen_range(10..=1_000)))
            .collect();
        let values: Vec<i64> = (0..security_count).map(|_| rng.gen_range(5..=600)).collect();

        let mut directory = directory(&balances);
        let mut pool = pool(&values);
        let mut ledger = ChangeLedger::new();

        let result = allocate(&mut directory, &mut pool, &config, &mut ledger);

        assert_eq!(securities_held(&directory, &pool), values.len(), "seed {seed}");
        pool.verify_invariants()
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert!(pool.iter().all(|s| s.pledge_id.is_none()), "seed {seed}");

        match result {
            Ok(_) => {
                assert!(directory.underpledged().is_empty(), "seed {seed}");
                for customer in directory.iter() {
                    assert!(customer
                        .pledged
                        .iter()
                        .all(|s| s.pledge_id == Some(customer.pledge_code)));
                }
                assert_eq!(
                    ledger.pledged.len(),
                    directory.iter().map(|c| c.pledged.len()).sum::<usize>(),
                    "seed {seed}"
                );
            }
            Err(err) => {
                assert!(matches!(err, AllocationError::Exhausted { .. }), "seed {seed}: {err}");
                assert!(directory.iter().all(|c| c.pledged.is_empty()), "seed {seed}");
                assert!(ledger.pledged.is_empty(), "seed {seed}");
            }
        }
    }
}

/// Same book, same operations, same state root.
#[test]
fn allocation_is_deterministic() {
    let run = || {
        let mut directory = directory(&[(1, 240), (2, 90), (3, 380), (4, 55)]);
        let mut pool = pool(&[100, 250, 400, 75, 30, 500, 20, 60]);
        let mut ledger = ChangeLedger::new();
        allocate(&mut directory, &mut pool, &RelaxationConfig::default(), &mut ledger).unwrap();
        (pool.state_root().unwrap(), ledger)
    };

    let (root1, ledger1) = run();
    let (root2, ledger2) = run();
    assert_eq!(root1, root2);
    assert_eq!(ledger1, ledger2);
}
