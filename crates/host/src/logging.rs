//! Logger setup for the host binaries.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Install the global logger.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects debug, and the
/// default is info.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    // Fails only when a logger is already installed (repeated calls in tests).
    let _ = Builder::from_env(env).format_timestamp_millis().try_init();
}
