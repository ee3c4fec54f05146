//! Error types for the pledging engine.
//!
//! Each failure family has its own enum so callers can match on exactly the
//! outcomes an operation can produce. [`PledgeError`] wraps all of them for
//! code that just wants to propagate with `?`.

use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed input while building a security, account or customer.
///
/// Construction is all-or-nothing: when this is returned nothing has been
/// inserted anywhere.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Row does not have the fixed number of fields
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A numeric field could not be parsed
    #[error("field `{field}` is not numeric: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// An amount field parsed to a negative value
    #[error("field `{field}` must not be negative: {value}")]
    NegativeAmount { field: &'static str, value: Decimal },
}

/// A request could not be covered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// A single pass failed on this customer
    #[error("insufficient securities for customer {pledge_code}: needed {needed} at threshold {threshold}")]
    Insufficient {
        pledge_code: u32,
        needed: Decimal,
        threshold: Decimal,
    },

    /// Every threshold down to the floor failed
    #[error("insufficient securities available after relaxing threshold to {floor}")]
    Exhausted { floor: Decimal },

    /// Threshold outside [0, 1]
    #[error("threshold {0} is outside [0, 1]")]
    InvalidThreshold(Decimal),
}

/// A red-black tree rule that does not hold.
///
/// Never produced by normal operation; seeing one means the tree code has a
/// defect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// In-order sequence decreases at this node
    #[error("node {key} with value {value} follows larger value {previous}")]
    OutOfOrder {
        key: usize,
        value: Decimal,
        previous: Decimal,
    },

    /// Red node with a red child
    #[error("red node {key} has a red child")]
    RedRed { key: usize },

    /// Root is red
    #[error("root node {key} is red")]
    RedRoot { key: usize },

    /// Child does not point back to its parent
    #[error("node {key} has a broken parent link")]
    BrokenParentLink { key: usize },

    /// Two paths below a node carry different black counts
    #[error("black height differs below node {key}: left {left}, right {right}")]
    BlackHeight { key: usize, left: usize, right: usize },

    /// Height outside [floor(log2(n+1)), 2*floor(log2(n+1))]
    #[error("height {height} outside [{min}, {max}] for {count} nodes")]
    Height {
        height: usize,
        count: usize,
        min: usize,
        max: usize,
    },

    /// Slab holds nodes the structure cannot reach
    #[error("{stored} nodes stored but {reachable} reachable from the root")]
    Unreachable { stored: usize, reachable: usize },
}

/// Invalid relaxation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: Decimal },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },

    #[error("step must be positive, got {0}")]
    NonPositiveStep(Decimal),

    #[error("floor {floor} is above start threshold {start}")]
    FloorAboveStart { floor: Decimal, start: Decimal },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Umbrella error for the crate.
#[derive(Error, Debug)]
pub enum PledgeError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// SSZ encoding failed while fingerprinting the pool
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Subscriber could not be installed
    #[error("logging init failed: {0}")]
    Logging(String),
}
