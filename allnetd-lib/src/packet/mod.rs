pub mod datareq;
pub mod fingerprint;
pub mod header;
pub mod mgmt;
pub mod signature;
pub mod transport;
pub mod validate;

pub use fingerprint::{fingerprint, Fingerprint};
pub use header::Header;
pub use signature::split_signature;
pub use validate::is_valid_message;
