//! # Pledge Engine
//!
//! Collateral pledging: covers customer balance deficits with securities
//! drawn from a shared pool.
//!
//! ## Architecture
//!
//! - **Types**: Security, Customer, Account, fixed-point amount helpers
//! - **Tree**: red-black pool of securities keyed by market value, slab-backed
//! - **Engine**: small-first / large-first search, matcher, relaxation controller
//! - **Directory**: customers by pledge code
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical inputs produce identical pools and state roots
//! 2. **No Floating Point**: all amounts and thresholds are `Decimal`
//! 3. **Slab Storage**: tree nodes live in an arena, linked by key
//! 4. **Atomic Passes**: a failed allocation pass leaves no trace

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Security, Customer, Account
pub mod types;

/// Security pool: red-black tree with slab-based storage
pub mod tree;

/// Allocation engine: search strategies, matching, relaxation
pub mod engine;

/// Customer directory
pub mod directory;

/// Relaxation schedule configuration
pub mod config;

pub mod error;
pub mod logging;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::RelaxationConfig;
pub use directory::{CustomerDirectory, Placement};
pub use engine::{
    allocate, defragment_and_repledge, run_allocation_pass, AllocationOutcome, ChangeLedger,
    ImportState, PledgeSession, RepledgeOutcome, Strategy,
};
pub use error::{AllocationError, ConfigError, ConstructionError, InvariantViolation, PledgeError};
pub use tree::{SecurityTree, TreeStats};
pub use types::{Account, ChangeStatus, Customer, Security};
