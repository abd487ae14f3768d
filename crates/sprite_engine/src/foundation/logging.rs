//! Logging utilities
//!
//! The engine logs through the `log` facade: `trace!` for cache hits and
//! misses, `debug!` for resource builds, `warn!` for recoverable contract
//! slips. Binaries and tests pick the sink.

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level, still overridable by `RUST_LOG`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Route log output to the test harness
///
/// Call at the top of a test to see engine logs with `--nocapture`.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}
