//! Logging initialization.
//!
//! - `RUST_LOG`: level filter (default: `info`). Targets used by the engine
//!   are `matcher`, `relaxation` and `directory`, e.g.
//!   `RUST_LOG=info,matcher=debug`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::PledgeError;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Install a global fmt subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging() -> Result<(), PledgeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| PledgeError::Logging(e.to_string()))
}
