//! Tracing subscriber setup.

use crossfill_types::{CrossfillError, Result};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "crossfill=info";

/// Install a global fmt subscriber, JSON-formatted if `json` is set.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place and return `Ok`.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| CrossfillError::Configuration(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_ok() {
        tracing::debug!(json, "Tracing initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        assert!(init_tracing(false).is_ok());
        assert!(init_tracing(true).is_ok());
    }
}
