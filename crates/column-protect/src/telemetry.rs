//! Tracing setup for hosts that embed the library.
//!
//! The library only emits `tracing` events: a `debug` per mask tree built and
//! a `warn` when a cipher is released after a keystream failure. Neither
//! carries key material or column values. A host that has no subscriber of
//! its own can call [`init`] to get them as JSON lines.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: this workspace's crates at
/// `log_level`, everything else at `warn`.
fn default_directives(log_level: &str) -> String {
    format!("warn,column_protect={log_level},common={log_level}")
}

/// Install a JSON subscriber for the protection layer's events.
///
/// `log_level` is usually [`crate::config::ProtectionConfig::log_level`].
/// `RUST_LOG` replaces the whole filter when set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise column-protect tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_workspace_crates() {
        assert_eq!(
            default_directives("debug"),
            "warn,column_protect=debug,common=debug"
        );
        assert!(default_directives("info").parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn second_init_fails() {
        // Whichever call comes first in this process wins; a repeat must fail.
        let _ = init("debug");
        assert!(init("debug").is_err());
    }
}
