//! Repeatable allocation runs against one imported book.
//!
//! A [`PledgeSession`] keeps the book exactly as it stood after import and
//! the overage filter. Every run restores that baseline first, so the
//! change ledger always lists changes against the imported book, however
//! many times the allocation is rerun.
//!
//! ```text
//! import ──> ImportState ──overage filter──> baseline
//!                                               │
//!             allocate / repledge <── restore ──┘  (every run)
//! ```

use tracing::debug;

use crate::config::RelaxationConfig;
use crate::directory::CustomerDirectory;
use crate::engine::{
    allocate, defragment_and_repledge, release_overpledged, AllocationOutcome, ChangeLedger,
    RepledgeOutcome,
};
use crate::error::AllocationError;
use crate::tree::SecurityTree;

/// Customers, pool and change log as a unit
#[derive(Debug, Clone, Default)]
pub struct ImportState {
    pub directory: CustomerDirectory,
    pub pool: SecurityTree,
    /// Changes made by the import itself, e.g. pledges to unknown customers
    pub ledger: ChangeLedger,
}

impl ImportState {
    pub fn new(directory: CustomerDirectory, pool: SecurityTree, ledger: ChangeLedger) -> Self {
        Self {
            directory,
            pool,
            ledger,
        }
    }
}

/// An imported book plus the state of its latest run.
#[derive(Debug, Clone)]
pub struct PledgeSession {
    config: RelaxationConfig,
    /// Post-import, post-filter state; never modified after capture
    baseline: ImportState,
    current: ImportState,
}

impl PledgeSession {
    /// Apply the overage filter to `import` and keep the result as the
    /// baseline for every later run.
    pub fn new(mut import: ImportState, config: RelaxationConfig) -> Self {
        let released = release_overpledged(
            &mut import.directory,
            &mut import.pool,
            &mut import.ledger,
            config.overage_limit,
        );
        debug!(
            target: "session",
            released,
            customers = import.directory.len(),
            pool = import.pool.len(),
            "Import state captured"
        );

        Self {
            config,
            current: import.clone(),
            baseline: import,
        }
    }

    /// Restore the baseline, then run the ordinary update.
    pub fn allocate(&mut self) -> Result<AllocationOutcome, AllocationError> {
        self.restore();
        let ImportState {
            directory,
            pool,
            ledger,
        } = &mut self.current;
        allocate(directory, pool, &self.config, ledger)
    }

    /// Restore the baseline, then unwind every pledge and repledge.
    pub fn repledge(&mut self) -> Result<RepledgeOutcome, AllocationError> {
        self.restore();
        let ImportState {
            directory,
            pool,
            ledger,
        } = &mut self.current;
        defragment_and_repledge(directory, pool, &self.config, ledger)
    }

    /// Discard the latest run
    pub fn restore(&mut self) {
        self.current.clone_from(&self.baseline);
    }

    #[inline]
    pub fn config(&self) -> &RelaxationConfig {
        &self.config
    }

    #[inline]
    pub fn baseline(&self) -> &ImportState {
        &self.baseline
    }

    #[inline]
    pub fn directory(&self) -> &CustomerDirectory {
        &self.current.directory
    }

    #[inline]
    pub fn pool(&self) -> &SecurityTree {
        &self.current.pool
    }

    #[inline]
    pub fn ledger(&self) -> &ChangeLedger {
        &self.current.ledger
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
