//! Randomized tests for the security pool tree.
//!
//! These tests verify:
//! 1. Every red-black rule holds after every insert and remove
//! 2. Removing everything, in any order, leaves an empty tree
//! 3. The range probe agrees with a brute-force scan
//! 4. Identical operation sequences give identical state roots
//!
//! ```bash
//! cargo test --release --test tree_stress_test -- --nocapture
//! ```

use std::time::Instant;

use pledge_engine::{Security, SecurityTree};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Operations in the checked insert/remove mix
const MIXED_OPS: usize = 3_000;

/// Securities in the bulk tests
const BULK_COUNT: usize = 20_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Deterministic securities valued between 0.01 and 5000.00.
///
/// Values are drawn from a small range so duplicates are common.
fn generate_securities(count: usize, seed: u64) -> Vec<Security> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let cents: i64 = rng.gen_range(1..=500_000);
            Security::with_value(i as u32 + 1, Decimal::new(cents, 2))
        })
        .collect()
}

/// Insert then remove a seeded mix and return the final state root.
fn run_sequence(seed: u64) -> [u8; 32] {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tree = SecurityTree::new();
    let mut live: Vec<(u32, Decimal)> = Vec::new();

    for security in generate_securities(2_000, seed) {
        live.push((security.ticket, security.market_value));
        tree.insert(security);

        if rng.gen_bool(0.3) {
            let (ticket, value) = live.swap_remove(rng.gen_range(0..live.len()));
            let key = tree.find(ticket, value).expect("live security must be found");
            tree.remove(key);
        }
    }

    tree.state_root().expect("state root")
}

// ============================================================================
// STRESS TESTS
// ============================================================================

#[test]
fn stress_invariants_after_every_operation() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut tree = SecurityTree::new();
    let mut live: Vec<(u32, Decimal)> = Vec::new();
    let mut next_ticket = 1u32;

    for step in 0..MIXED_OPS {
        let insert = live.is_empty() || rng.gen_bool(0.6);
        if insert {
            // Narrow range: many equal values
            let value = Decimal::from(rng.gen_range(0..50));
            tree.insert(Security::with_value(next_ticket, value));
            live.push((next_ticket, value));
            next_ticket += 1;
        } else {
            let (ticket, value) = live.swap_remove(rng.gen_range(0..live.len()));
            let key = tree.find(ticket, value).expect("live security must be found");
            let removed = tree.remove(key).expect("key is live");
            assert_eq!(removed.ticket, ticket, "step {step}: wrong security returned");
            assert_eq!(removed.market_value, value);
        }

        let stats = tree
            .verify_invariants()
            .unwrap_or_else(|e| panic!("step {step}: {e}"));
        assert_eq!(stats.count, live.len());
    }
}

#[test]
fn stress_remove_all_in_random_order() {
    let securities = generate_securities(BULK_COUNT, 42);
    let mut order: Vec<(u32, Decimal)> = securities
        .iter()
        .map(|s| (s.ticket, s.market_value))
        .collect();

    let start = Instant::now();
    let mut tree = SecurityTree::with_capacity(BULK_COUNT);
    tree.extend(securities);
    println!("Inserted {} securities in {:.2?}", BULK_COUNT, start.elapsed());

    let stats = tree.verify_invariants().expect("valid after bulk insert");
    assert_eq!(stats.count, BULK_COUNT);
    // 2 * floor(log2(20001)) = 28
    assert!(stats.height <= 28);

    let mut rng = ChaCha8Rng::seed_from_u64(43);
    order.shuffle(&mut rng);

    let start = Instant::now();
    for (i, (ticket, value)) in order.into_iter().enumerate() {
        let key = tree.find(ticket, value).expect("security must be found");
        assert!(tree.remove(key).is_some());
        if i % 1_000 == 0 {
            tree.verify_invariants().expect("valid during removal");
        }
    }
    println!("Removed {} securities in {:.2?}", BULK_COUNT, start.elapsed());

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.count(), 0);
    assert_eq!(tree.sum(), Decimal::ZERO);
    assert!(tree.minimum().is_none());
    assert!(tree.verify_invariants().is_ok());
}

#[test]
fn stress_drain_from_minimum() {
    let mut tree: SecurityTree = generate_securities(5_000, 11).into_iter().collect();

    let mut previous = Decimal::MIN;
    while let Some(key) = tree.minimum() {
        let security = tree.remove(key).expect("minimum is live");
        assert!(security.market_value >= previous);
        previous = security.market_value;
    }
    assert!(tree.verify_invariants().is_ok());
}

#[test]
fn stress_range_search_matches_scan() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let tree: SecurityTree = generate_securities(1_000, 99).into_iter().collect();
    let values: Vec<Decimal> = tree.iter().map(|s| s.market_value).collect();

    for _ in 0..2_000 {
        let a = Decimal::new(rng.gen_range(0..=520_000), 2);
        let b = Decimal::new(rng.gen_range(0..=2_000), 2);
        let (min, max) = (a, a + b);

        let expected = values.iter().any(|v| *v >= min && *v <= max);
        match tree.range_search(min, max) {
            Some(key) => {
                let value = tree.value_of(key).expect("returned key is live");
                assert!(value >= min && value <= max, "{value} outside [{min}, {max}]");
            }
            None => assert!(!expected, "a value in [{min}, {max}] exists but was not found"),
        }
    }
}

#[test]
fn verify_determinism() {
    let root1 = run_sequence(12345);
    let root2 = run_sequence(12345);
    let root3 = run_sequence(54321);

    assert_eq!(root1, root2, "same seed must give the same state root");
    assert_ne!(root1, root3, "different seeds should differ");
    println!("State root: {}", hex::encode(root1));
}
