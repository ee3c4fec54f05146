//! Customer and account types.
//!
//! A customer is the demand side of the engine: the sum of its account
//! balances must be covered by the market value of the securities pledged
//! to it. `over_under` is negative while the customer is underpledged, and
//! `needed()` is the deficit a matching run has to cover.

use rust_decimal::Decimal;

use crate::error::ConstructionError;
use crate::types::amount::{parse_id, parse_signed_amount};
use crate::types::Security;

/// Number of ordered fields in a customer/account row
pub const CUSTOMER_FIELDS: usize = 9;

/// A single deposit account belonging to a customer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    pub account_number: u32,
    pub interest_rate: String,
    pub account_type: String,
    pub class_code_description: String,
    pub current_balance: Decimal,
}

impl Account {
    /// Build the account part (fields 4..9) of a customer row
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ConstructionError> {
        check_field_count(fields)?;
        let field = |i: usize| fields[i].as_ref();

        Ok(Self {
            account_number: parse_id("account_number", field(4))?,
            interest_rate: field(5).to_string(),
            account_type: field(6).to_string(),
            class_code_description: field(7).to_string(),
            current_balance: parse_signed_amount("current_balance", field(8))?,
        })
    }
}

/// A customer whose balances must be collateralized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Customer {
    pub pledge_code: u32,
    pub tax_id: u64,
    pub name1: String,
    pub name2: String,

    pub accounts: Vec<Account>,

    /// Securities currently pledged, in pledge order
    pub pledged: Vec<Security>,

    // Derived; kept current by `refresh_balances`
    total_balance: Decimal,
    total_pledged: Decimal,
    over_under: Decimal,
}

impl Customer {
    /// Build a customer from one 9-field row:
    ///
    /// pledge code, tax id, name1, name2, account number, interest rate,
    /// account type, class code description, current balance.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ConstructionError> {
        check_field_count(fields)?;
        let field = |i: usize| fields[i].as_ref();

        let pledge_code = parse_id("pledge_code", field(0))?;
        let tax_id = parse_id("tax_id", field(1))?;
        let account = Account::from_fields(fields)?;

        let mut customer = Self::new(pledge_code, field(2));
        customer.tax_id = tax_id;
        customer.name2 = field(3).to_string();
        customer.add_account(account);
        Ok(customer)
    }

    /// Customer with no accounts yet
    pub fn new(pledge_code: u32, name: &str) -> Self {
        Self {
            pledge_code,
            name1: name.to_string(),
            ..Self::default()
        }
    }

    /// Customer with a single account of `balance`, for tests and demos
    pub fn with_balance(pledge_code: u32, name: &str, balance: Decimal) -> Self {
        let mut customer = Self::new(pledge_code, name);
        customer.add_account(Account {
            account_number: pledge_code,
            current_balance: balance,
            ..Account::default()
        });
        customer
    }

    pub fn add_account(&mut self, account: Account) {
        self.accounts.push(account);
        self.refresh_balances();
    }

    /// Recompute balance, pledged total and over/under.
    ///
    /// Must be called after any change to `accounts` or `pledged`.
    pub fn refresh_balances(&mut self) {
        self.total_balance = self.accounts.iter().map(|a| a.current_balance).sum();
        self.total_pledged = self.pledged.iter().map(|s| s.market_value).sum();
        self.over_under = self.total_pledged - self.total_balance;
    }

    #[inline]
    pub fn total_balance(&self) -> Decimal {
        self.total_balance
    }

    #[inline]
    pub fn total_pledged(&self) -> Decimal {
        self.total_pledged
    }

    /// Pledged minus balance; negative means underpledged
    #[inline]
    pub fn over_under(&self) -> Decimal {
        self.over_under
    }

    /// Deficit to cover; zero or negative means no action
    #[inline]
    pub fn needed(&self) -> Decimal {
        -self.over_under
    }

    #[inline]
    pub fn is_underpledged(&self) -> bool {
        self.over_under.is_sign_negative() && !self.over_under.is_zero()
    }

    /// Take a security into the pledged list
    pub fn pledge(&mut self, mut security: Security) {
        security.assign_to(self.pledge_code, &self.name1);
        self.pledged.push(security);
        self.refresh_balances();
    }

    /// Remove every pledged security, most recent last
    pub fn take_pledged(&mut self) -> Vec<Security> {
        let pledged = std::mem::take(&mut self.pledged);
        self.refresh_balances();
        pledged
    }

    /// Remove pledges made after the list had `len` entries
    pub fn take_pledged_after(&mut self, len: usize) -> Vec<Security> {
        let tail = if len < self.pledged.len() {
            self.pledged.split_off(len)
        } else {
            Vec::new()
        };
        self.refresh_balances();
        tail
    }
}

fn check_field_count<S>(fields: &[S]) -> Result<(), ConstructionError> {
    if fields.len() != CUSTOMER_FIELDS {
        return Err(ConstructionError::FieldCount {
            expected: CUSTOMER_FIELDS,
            found: fields.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
