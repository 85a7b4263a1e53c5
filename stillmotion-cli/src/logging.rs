//! Logging and tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

/// Level used when `RUST_LOG` is not set
pub fn default_level(verbose: bool, quiet: bool) -> &'static str {
    match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` wins over the flags.
///
/// Logs go to stderr so stdout only carries the run summary.
pub fn init_logging(verbose: bool, quiet: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
