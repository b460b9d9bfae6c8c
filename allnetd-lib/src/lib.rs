#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod daemon;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod packet;
pub mod pipes;
pub mod priority;
pub mod rate;
pub mod scope;
pub mod social;
pub mod telemetry;

pub use classify::Classifier;
pub use config::{load_from_path, Config};
pub use dedup::{DuplicateFilter, DuplicateStatus};
pub use dispatch::{DispatchOutcome, DropReason, Dispatcher};
pub use error::{DaemonError, Result};
pub use pipes::PipeRegistry;
pub use priority::compute_priority;
pub use scope::Scope;
pub use social::{SocialTable, Snapshot};
