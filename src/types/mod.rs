//! Core data types for the pledging engine
//!
//! ## Types
//!
//! - [`Security`]: A pledgeable security, keyed in the pool by market value
//! - [`ChangeStatus`]: Pledge / Unpledge tag carried into the change logs
//! - [`Customer`]: A customer whose account balances need collateral
//! - [`Account`]: One deposit account of a customer
//! - [`PoolEntry`]: SSZ view of a pooled security for state roots
//!
//! ## Amounts
//!
//! All amounts are `rust_decimal::Decimal`. See [`amount`] for parsing and
//! fixed-point conversion.

mod customer;
mod entry;
mod security;
pub mod amount;

// Re-export all types at module level
pub use customer::{Account, Customer, CUSTOMER_FIELDS};
pub use entry::PoolEntry;
pub use security::{ChangeStatus, Security, SECURITY_FIELDS};
