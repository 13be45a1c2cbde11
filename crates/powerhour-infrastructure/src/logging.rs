//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (usually the config's
/// `log_level`) is used. Output goes to stderr so command output on stdout
/// stays clean. Calling this twice keeps the first subscriber.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();

    if installed.is_err() {
        tracing::debug!(target: "logging", "[Logging] Subscriber already installed");
    }
}
