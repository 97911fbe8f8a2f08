//! Logging utilities
//!
//! The crate logs through the `log` facade: resource creation at `debug`, deleter
//! calls at `trace` and native failures that are returned as values at `warn`.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`.
pub fn init() {
    env_logger::init();
}

/// Initialize logging unless a logger is already installed.
///
/// Returns `false` if one was.
pub fn try_init() -> bool {
    env_logger::try_init().is_ok()
}
