//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never mix with the child's stdout.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or
/// informational messages too when `verbose` is set.
pub fn init(verbose: bool) {
    let default = if verbose {
        "shadow_exec=info"
    } else {
        "shadow_exec=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
