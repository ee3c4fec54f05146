//! Allocation engine.
//!
//! ## Layers
//!
//! 1. [`search`]: one strategy run against a clone of the pool
//! 2. [`matcher`]: both strategies for one customer, selection, commit
//! 3. [`relaxation`]: passes over the directory, rollback, threshold decay
//! 4. [`session`]: reruns from the imported book
//!
//! ## Rules
//!
//! - **Determinism**: customers are visited in pledge code order and every
//!   probe is a fixed descent, so identical inputs give identical pools.
//! - **Exact math**: thresholds and amounts are `Decimal`.
//! - **Atomic passes**: a failed pass leaves pool, customers and ledger as
//!   they were before it.
//!
//! ## Example
//!
//! ```
//! use pledge_engine::config::RelaxationConfig;
//! use pledge_engine::directory::CustomerDirectory;
//! use pledge_engine::engine::{allocate, AllocationOutcome, ChangeLedger};
//! use pledge_engine::tree::SecurityTree;
//! use pledge_engine::types::{Customer, Security};
//! use rust_decimal::Decimal;
//!
//! let mut directory = CustomerDirectory::new();
//! directory.insert(Customer::with_balance(1, "CITY", Decimal::from(240)));
//!
//! let mut pool = SecurityTree::new();
//! pool.insert(Security::with_value(1, Decimal::from(100)));
//! pool.insert(Security::with_value(2, Decimal::from(250)));
//! pool.insert(Security::with_value(3, Decimal::from(400)));
//!
//! let mut ledger = ChangeLedger::new();
//! let outcome = allocate(&mut directory, &mut pool, &RelaxationConfig::default(), &mut ledger).unwrap();
//!
//! assert!(matches!(outcome, AllocationOutcome::Direct(_)));
//! assert_eq!(ledger.pledged.len(), 1);
//! assert_eq!(ledger.pledged[0].market_value, Decimal::from(250));
//! ```

pub mod ledger;
pub mod matcher;
pub mod relaxation;
pub mod search;
pub mod session;

pub use ledger::ChangeLedger;
pub use matcher::{match_request, select, MatchResult};
pub use relaxation::{
    allocate, defragment_and_repledge, release_overpledged, run_allocation_pass, unpledge_all,
    AllocationOutcome, PassSummary, RepledgeOutcome,
};
pub use search::{search, SearchOutcome, Strategy};
pub use session::{ImportState, PledgeSession};
