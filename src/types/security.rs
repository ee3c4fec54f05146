//! Security type: the allocatable unit held in the pool.
//!
//! A security carries fixed identity fields from the daily holdings report
//! plus the mutable state the engine drives: its market value (the pool sort
//! key), the customer it is pledged to, and the change tag written into the
//! pledge/unpledge logs.

use std::fmt;

use rust_decimal::Decimal;

use crate::error::ConstructionError;
use crate::types::amount::{parse_amount, parse_id};

/// Number of ordered fields in a security row
pub const SECURITY_FIELDS: usize = 11;

// ============================================================================
// ChangeStatus enum
// ============================================================================

/// What happened to a security during the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeStatus {
    /// Untouched since import
    #[default]
    Unchanged,
    /// Newly pledged to a customer
    Pledge,
    /// Released from the customer it was pledged to
    Unpledge,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Unchanged => "",
            ChangeStatus::Pledge => "Pledge",
            ChangeStatus::Unpledge => "Unpledge",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Security struct
// ============================================================================

/// A security available for pledging.
///
/// ## Example
///
/// ```
/// use pledge_engine::types::Security;
///
/// let security = Security::from_fields(&[
///     "INV", "3130ATXD4", "1042", "2031-06-30", "", "",
///     "0", "250000", "248125.50", "AGENCY", "FHLB 4.5% 2031",
/// ]).unwrap();
///
/// assert_eq!(security.ticket, 1042);
/// assert!(security.pledge_id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Security {
    pub portfolio: String,
    pub cusip: String,
    pub ticket: u32,
    pub maturity: String,

    /// Customer pledge code this security is assigned to
    pub pledge_id: Option<u32>,
    pub pledge_description: String,
    pub pledge_amount: Decimal,

    pub par_value: Decimal,
    /// Sort key of the pool
    pub market_value: Decimal,
    pub group: String,
    pub description: String,

    pub change_status: ChangeStatus,
}

impl Security {
    /// Build a security from its 11 ordered report fields:
    ///
    /// portfolio, cusip, ticket, maturity, pledge id (may be empty),
    /// pledge description, pledge amount, par value, market value, group,
    /// description.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ConstructionError> {
        if fields.len() != SECURITY_FIELDS {
            return Err(ConstructionError::FieldCount {
                expected: SECURITY_FIELDS,
                found: fields.len(),
            });
        }
        let field = |i: usize| fields[i].as_ref();

        let pledge_id = match field(4).trim() {
            "" => None,
            raw => match parse_id::<u32>("pledge_id", raw)? {
                0 => None,
                id => Some(id),
            },
        };

        Ok(Self {
            portfolio: field(0).to_string(),
            cusip: field(1).to_string(),
            ticket: parse_id("ticket", field(2))?,
            maturity: field(3).to_string(),
            pledge_id,
            pledge_description: field(5).to_string(),
            pledge_amount: parse_amount("pledge_amount", field(6))?,
            par_value: parse_amount("par_value", field(7))?,
            market_value: parse_amount("market_value", field(8))?,
            group: field(9).to_string(),
            description: field(10).to_string(),
            change_status: ChangeStatus::Unchanged,
        })
    }

    /// Minimal security for tests and benchmarks
    pub fn with_value(ticket: u32, market_value: Decimal) -> Self {
        Self {
            ticket,
            market_value,
            par_value: market_value,
            ..Self::default()
        }
    }

    /// Is this security currently pledged to a customer
    #[inline]
    pub fn is_pledged(&self) -> bool {
        self.pledge_id.is_some()
    }

    /// Assign to a customer
    pub fn assign_to(&mut self, pledge_code: u32, description: &str) {
        self.pledge_id = Some(pledge_code);
        self.pledge_description = description.to_string();
    }

    /// Clear the customer assignment and change tag so the security can
    /// go back into the pool
    pub fn release(&mut self) {
        self.pledge_id = None;
        self.pledge_description.clear();
        self.change_status = ChangeStatus::Unchanged;
    }

    /// Independent copy carrying `status`, for the change logs
    pub fn tagged(&self, status: ChangeStatus) -> Self {
        Self {
            change_status: status,
            ..self.clone()
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
