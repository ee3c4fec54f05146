//! Monetary amount helpers.
//!
//! ## Overview
//!
//! Amounts are carried as `rust_decimal::Decimal` everywhere in the engine so
//! the threshold schedule and running deficits are exact. For hashing the
//! pool into a state root we also need a fixed-width integer form; values are
//! stored as u64 scaled by 10^8.
//!
//! ## Examples
//!
//! ```
//! use pledge_engine::types::amount::decimal_to_fixed;
//! use rust_decimal::Decimal;
//!
//! let value = decimal_to_fixed(Decimal::new(25_000_075, 2)).unwrap();
//! assert_eq!(value, 25_000_075_000_000);
//! ```

use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::ConstructionError;

/// Scaling factor for fixed-point conversion: 10^8
pub const SCALE: u64 = 100_000_000;

// ============================================================================
// Fixed-point Conversion
// ============================================================================

/// Convert a Decimal to fixed-point u64
///
/// Negative or out-of-range values yield `None`. Digits past the eighth
/// decimal place are rounded.
pub fn decimal_to_fixed(d: Decimal) -> Option<u64> {
    if d.is_sign_negative() {
        return None;
    }

    let scaled = d.checked_mul(Decimal::from(SCALE))?;
    scaled.round_dp(0).to_u64()
}

// ============================================================================
// Field Parsing
// ============================================================================

/// Parse a non-negative amount field.
///
/// Surrounding whitespace is ignored. Anything else that is not a decimal
/// number is rejected; nothing is coerced to zero.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<Decimal, ConstructionError> {
    let value = Decimal::from_str(raw.trim()).map_err(|_| ConstructionError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConstructionError::NegativeAmount { field, value });
    }

    Ok(value)
}

/// Parse a signed amount field (account balances may be overdrawn).
pub fn parse_signed_amount(field: &'static str, raw: &str) -> Result<Decimal, ConstructionError> {
    Decimal::from_str(raw.trim()).map_err(|_| ConstructionError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// Parse an integer identifier field.
pub fn parse_id<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ConstructionError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConstructionError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

/// Whole units of an amount, fraction dropped toward zero.
///
/// Strategy totals are compared at this precision.
#[inline]
pub fn whole_units(amount: Decimal) -> Decimal {
    amount.trunc()
}

// ============================================================================
// Unit Tests
// ============================================================================
