//! In-memory customer directory.
//!
//! Customers are kept in a `BTreeMap` by pledge code so every pass visits
//! them in the same order.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::engine::ChangeLedger;
use crate::error::ConstructionError;
use crate::tree::SecurityTree;
use crate::types::{Customer, Security};

/// Where [`CustomerDirectory::place_security`] put a security
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Attached to the customer named by its pledge id
    Pledged(u32),
    /// Released into the pool
    Pooled,
}

/// Customers by pledge code
#[derive(Debug, Clone, Default)]
pub struct CustomerDirectory {
    customers: BTreeMap<u32, Customer>,
}

impl CustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one 9-field customer/account row.
    ///
    /// A row for a pledge code already present adds its account to that
    /// customer. Returns the pledge code.
    pub fn load_row<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<u32, ConstructionError> {
        let mut customer = Customer::from_fields(fields)?;
        let pledge_code = customer.pledge_code;

        match self.customers.get_mut(&pledge_code) {
            Some(existing) => {
                for account in customer.accounts.drain(..) {
                    existing.add_account(account);
                }
                trace!(target: "directory", pledge_code, "Account added to existing customer");
            }
            None => {
                self.customers.insert(pledge_code, customer);
                trace!(target: "directory", pledge_code, "Customer loaded");
            }
        }
        Ok(pledge_code)
    }

    /// Add or replace a customer
    pub fn insert(&mut self, customer: Customer) -> Option<Customer> {
        self.customers.insert(customer.pledge_code, customer)
    }

    #[inline]
    pub fn get(&self, pledge_code: u32) -> Option<&Customer> {
        self.customers.get(&pledge_code)
    }

    #[inline]
    pub fn get_mut(&mut self, pledge_code: u32) -> Option<&mut Customer> {
        self.customers.get_mut(&pledge_code)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Customers in pledge code order
    pub fn iter(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Customer> {
        self.customers.values_mut()
    }

    /// Pledge codes of every customer with an open deficit
    pub fn underpledged(&self) -> Vec<u32> {
        self.customers
            .values()
            .filter(|c| c.is_underpledged())
            .map(|c| c.pledge_code)
            .collect()
    }

    /// Sum of open deficits
    pub fn total_needed(&self) -> Decimal {
        self.customers
            .values()
            .filter(|c| c.is_underpledged())
            .map(Customer::needed)
            .sum()
    }

    /// Route an imported security.
    ///
    /// A pledge id naming a known customer attaches the security to it.
    /// Anything else goes to the pool; if it carried a pledge id, an
    /// unpledge record is written first.
    pub fn place_security(
        &mut self,
        mut security: Security,
        pool: &mut SecurityTree,
        ledger: &mut ChangeLedger,
    ) -> Placement {
        if let Some(customer) = security.pledge_id.and_then(|id| self.customers.get_mut(&id)) {
            let pledge_code = customer.pledge_code;
            customer.pledged.push(security);
            customer.refresh_balances();
            return Placement::Pledged(pledge_code);
        }

        if let Some(pledge_id) = security.pledge_id {
            debug!(
                target: "directory",
                ticket = security.ticket,
                pledge_id,
                "Pledged to unknown customer, releasing"
            );
            ledger.record_unpledge(&security);
        }
        security.release();
        pool.insert(security);
        Placement::Pooled
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
