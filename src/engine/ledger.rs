//! Pledge / unpledge change logs.

use crate::types::{ChangeStatus, Security};

/// Ordered records of every pledge and release made during a run.
///
/// Entries are tagged copies; the securities themselves stay with the pool
/// or the customer that owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLedger {
    pub unpledged: Vec<Security>,
    pub pledged: Vec<Security>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pledge(&mut self, security: &Security) {
        self.pledged.push(security.tagged(ChangeStatus::Pledge));
    }

    pub fn record_unpledge(&mut self, security: &Security) {
        self.unpledged.push(security.tagged(ChangeStatus::Unpledge));
    }

    /// Current length of the pledge log, for [`ChangeLedger::discard_pledges_after`]
    #[inline]
    pub fn pledge_mark(&self) -> usize {
        self.pledged.len()
    }

    /// Drop pledge records written after `mark`
    pub fn discard_pledges_after(&mut self, mark: usize) {
        self.pledged.truncate(mark);
    }

    pub fn is_empty(&self) -> bool {
        self.unpledged.is_empty() && self.pledged.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
