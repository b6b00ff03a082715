//! Installs the `tracing` subscriber for the binary.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `kiln_stages=debug`.
pub const LOG_ENV: &str = "KILN_LOG";

/// The directive used when `KILN_LOG` is unset.
pub fn default_directive(quiet: bool, verbose: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, true) => "debug",
        (false, false) => "warn",
    }
}

/// Sets up logging to stderr. `KILN_LOG` takes precedence over the flags.
pub fn init(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
