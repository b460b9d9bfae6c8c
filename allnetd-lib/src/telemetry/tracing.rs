use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install the global `tracing` subscriber from the configured log level.
///
/// `RUST_LOG`, if set, takes precedence over `logging.level` from the config
/// file, matching the env-filter precedence convention used throughout the
/// ambient stack.
pub fn init_tracing(
    log_level: &str,
    show_target: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(show_target);

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("failed to set global tracing subscriber: {e}"))?;

    Ok(())
}

/// Flush stdout/stderr on shutdown so buffered log lines are not lost.
pub fn shutdown_tracing() {
    use std::io::Write;
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}
