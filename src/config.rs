//! Relaxation schedule configuration.
//!
//! Loaded with the `config` crate from `PLEDGE_*` environment variables,
//! optionally layered over a file:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PLEDGE_START_THRESHOLD` | 0.50 |
//! | `PLEDGE_STEP` | 0.01 |
//! | `PLEDGE_FLOOR` | 0.00 |
//! | `PLEDGE_OVERAGE_LIMIT` | 0.50 |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const ENV_PREFIX: &str = "PLEDGE";

/// Threshold schedule for the relaxation controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationConfig {
    /// Tolerance of the first pass
    pub start_threshold: Decimal,
    /// Decrease after each failed pass
    pub step: Decimal,
    /// Last threshold tried, inclusive
    pub floor: Decimal,
    /// A customer pledged above `balance * (1 + overage_limit)` is released
    /// before the first pass
    pub overage_limit: Decimal,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            start_threshold: Decimal::new(50, 2),
            step: Decimal::new(1, 2),
            floor: Decimal::ZERO,
            overage_limit: Decimal::new(50, 2),
        }
    }
}

impl RelaxationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let loaded: Self = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let loaded: Self = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("start_threshold", self.start_threshold), ("floor", self.floor)] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if self.step <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveStep(self.step));
        }
        if self.floor > self.start_threshold {
            return Err(ConfigError::FloorAboveStart {
                floor: self.floor,
                start: self.start_threshold,
            });
        }
        if self.overage_limit < Decimal::ZERO {
            return Err(ConfigError::Negative {
                field: "overage_limit",
                value: self.overage_limit,
            });
        }
        Ok(())
    }

    /// Thresholds from start down to floor, floor always last.
    ///
    /// The defaults give 0.50, 0.49, ..., 0.01, 0.00.
    pub fn schedule(&self) -> impl Iterator<Item = Decimal> {
        let floor = self.floor;
        let step = self.step;
        let first = (step > Decimal::ZERO && self.start_threshold >= floor).then_some(self.start_threshold);

        std::iter::successors(first, move |&current| {
            let next = current - step;
            if next >= floor {
                Some(next)
            } else if current > floor {
                Some(floor)
            } else {
                None
            }
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
