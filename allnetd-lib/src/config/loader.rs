use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{DaemonError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| DaemonError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| DaemonError::Config(format!("failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.duplicate.window_secs == 0 {
        return Err(DaemonError::Config("duplicate.window_secs must be > 0".into()));
    }
    if cfg.duplicate.capacity == 0 {
        return Err(DaemonError::Config("duplicate.capacity must be > 0".into()));
    }
    if cfg.social.update_secs == 0 {
        return Err(DaemonError::Config("social.update_secs must be > 0".into()));
    }
    if cfg.social.max_checks == 0 {
        return Err(DaemonError::Config("social.max_checks must be > 0".into()));
    }
    Ok(())
}
