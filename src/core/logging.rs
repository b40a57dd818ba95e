//! Tracing subscriber setup for the `delegateto` binary.
//!
//! The library only emits events; installing a subscriber is left to the
//! binary (or to an embedding application).

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `delegateto=trace`.
pub const LOG_ENV: &str = "DELEGATETO_LOG";

/// Default level for a given `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr subscriber. `DELEGATETO_LOG` wins over `verbosity`.
/// A second call is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
