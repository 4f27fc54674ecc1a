//! Subscriber setup for the engine's `tracing` output.

use tracing_subscriber::EnvFilter;

use crate::config::Diagnostics;

/// Install a formatted subscriber filtered by `diagnostics`.
///
/// `RUST_LOG`, when set and valid, takes precedence. Returns `false` if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init(diagnostics: Diagnostics) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(diagnostics.default_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        // The first call may lose to another test's subscriber; the second
        // call never installs.
        let _ = init(Diagnostics::Detailed);
        assert!(!init(Diagnostics::Quiet));
    }
}
