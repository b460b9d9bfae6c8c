use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use super::telemetry::LoggingConfig;

/// Top-level configuration for the daemon's own tunables.
///
/// This is distinct from the positional pipe file descriptors on the
/// command line: it never names a pipe, only the knobs the
/// core itself owns (duplicate window, social table refresh, trace grace
/// period, logging, metrics).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Duplicate filter tunables.
    #[serde(default)]
    pub duplicate: DuplicateConfig,
    /// Social table tunables.
    #[serde(default)]
    pub social: SocialConfig,
    /// Management classifier tunables (currently just the trace grace
    /// period; kept as its own section since it is conceptually separate
    /// from the social table).
    #[serde(default)]
    pub trace: TraceConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Metrics/health HTTP surface (optional; disabled unless `listen` is set).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Duplicate-filter tunables.
#[derive(Debug, Deserialize, Clone)]
pub struct DuplicateConfig {
    /// Age in seconds beyond which an entry is logically absent.
    #[serde(default = "default_duplicate_window_secs")]
    pub window_secs: u64,
    /// Maximum number of live entries before least-recent eviction kicks in.
    #[serde(default = "default_duplicate_capacity")]
    pub capacity: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self { window_secs: default_duplicate_window_secs(), capacity: default_duplicate_capacity() }
    }
}

fn default_duplicate_window_secs() -> u64 {
    60
}

fn default_duplicate_capacity() -> usize {
    100_000
}

/// Social-table tunables.
#[derive(Debug, Deserialize, Clone)]
pub struct SocialConfig {
    /// Seconds between automatic rebuilds.
    #[serde(default = "default_update_secs")]
    pub update_secs: u64,
    /// Maximum snapshot footprint in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Maximum number of signature checks `connection` may perform per lookup.
    #[serde(default = "default_max_checks")]
    pub max_checks: usize,
    /// Directory of per-contact TOML files.
    #[serde(default = "default_contacts_dir")]
    pub contacts_dir: PathBuf,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            update_secs: default_update_secs(),
            max_bytes: default_max_bytes(),
            max_checks: default_max_checks(),
            contacts_dir: default_contacts_dir(),
        }
    }
}

fn default_update_secs() -> u64 {
    30
}

fn default_max_bytes() -> usize {
    30_000
}

fn default_max_checks() -> usize {
    5
}

fn default_contacts_dir() -> PathBuf {
    PathBuf::from("/etc/allnet/contacts")
}

/// Management-classifier tunables.
#[derive(Debug, Deserialize, Clone)]
pub struct TraceConfig {
    /// Seconds after a suppressed foreign trace before the daemon resumes
    /// flooding TRACE_REQ, on the assumption the local trace handler died.
    #[serde(default = "default_trace_grace_secs")]
    pub grace_secs: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { grace_secs: default_trace_grace_secs() }
    }
}

fn default_trace_grace_secs() -> u64 {
    10
}

/// Metrics/health HTTP surface configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    /// Address to bind the loopback metrics/health server on. If absent, the
    /// server is not started.
    #[serde(default)]
    pub listen: Option<SocketAddr>,
}
