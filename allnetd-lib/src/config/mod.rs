mod loader;
mod root;
mod telemetry;

pub use loader::load_from_path;
pub use root::{Config, DuplicateConfig, MetricsConfig, SocialConfig, TraceConfig};
pub use telemetry::LoggingConfig;
