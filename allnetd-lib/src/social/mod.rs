mod contacts;
mod table;

pub use table::{SocialTable, Snapshot};
