//! Logging init: human-readable events on stderr, stdout stays for results.

use tracing_subscriber::EnvFilter;

/// Filter for a verbosity level: quiet = errors only, 0 = warn, 1 = info,
/// 2 = debug, 3+ = trace. `RUST_LOG` takes precedence when set.
pub fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bpub_resolver={level}")))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
