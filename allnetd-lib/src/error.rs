use thiserror::Error;

/// Errors that can occur in the forwarding daemon.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error on pipe {pipe}: {reason}")]
    Framing { pipe: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no pipes configured")]
    NoPipes,

    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
