//! Fixed-size pool entry used to fingerprint the pool.
//!
//! ## SSZ Serialization
//!
//! `PoolEntry` derives `SimpleSerialize` from ssz_rs so every entry encodes
//! to the same 20 bytes on every machine:
//! - ticket: u32 (4 bytes)
//! - market_value: u64 fixed-point, scaled by 10^8 (8 bytes)
//! - pledge_id: u64, 0 when unassigned (8 bytes)

use ssz_rs::prelude::*;

use crate::types::amount::decimal_to_fixed;
use crate::types::Security;

/// Compact, hashable view of a pooled security
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct PoolEntry {
    pub ticket: u32,
    pub market_value: u64,
    pub pledge_id: u64,
}

impl PoolEntry {
    /// Values that do not fit the fixed-point range saturate at `u64::MAX`.
    pub fn from_security(security: &Security) -> Self {
        Self {
            ticket: security.ticket,
            market_value: decimal_to_fixed(security.market_value).unwrap_or(u64::MAX),
            pledge_id: security.pledge_id.map(u64::from).unwrap_or(0),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
