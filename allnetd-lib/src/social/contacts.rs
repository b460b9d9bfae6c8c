use std::fs;
use std::path::Path;

use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use tracing::warn;

/// One contact, as read from the contacts directory.
///
/// This is the daemon's own concrete choice of on-disk format for
/// something the protocol deliberately leaves to a key-management
/// collaborator: one small TOML file per contact, matching the naming
/// convention the ambient stack already uses for its own config files.
#[derive(Debug, Deserialize)]
struct ContactFile {
    /// Ed25519 public key, hex-encoded.
    public_key: String,
    /// Declared social distance tier (0 = closest).
    social_distance: u8,
    /// Number of significant bits of the node address this key's prefix
    /// covers.
    prefix_nbits: u8,
}

/// A contact resolved from disk: a verifying key paired with the address
/// prefix and social distance it was declared under.
#[derive(Clone)]
pub struct Contact {
    pub verifying_key: VerifyingKey,
    pub prefix: [u8; 8],
    pub prefix_nbits: u8,
    pub social_distance: u8,
}

/// Load every contact file in `dir`.
///
/// A missing directory yields an empty table (a daemon with no configured
/// contacts still runs, it just never hands out a social-distance boost).
/// An unreadable or malformed individual file is logged and skipped, since
/// one corrupt file must not block the rest of the table from loading.
pub fn load_contacts_dir(dir: &Path) -> Vec<Contact> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(?dir, error = %e, "social table: contacts directory unreadable, using empty table");
            return Vec::new();
        }
    };

    let mut contacts = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        match load_contact_file(&path) {
            Ok(contact) => contacts.push(contact),
            Err(e) => warn!(?path, error = %e, "social table: skipping unreadable contact file"),
        }
    }
    contacts
}

fn load_contact_file(path: &Path) -> Result<Contact, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let parsed: ContactFile = toml::from_str(&text).map_err(|e| e.to_string())?;

    let key_bytes = hex::decode(parsed.public_key.trim()).map_err(|e| e.to_string())?;
    let key_bytes: [u8; 32] =
        key_bytes.try_into().map_err(|_| "public key must be 32 bytes".to_string())?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes).map_err(|e| e.to_string())?;

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&key_bytes[..8]);

    Ok(Contact {
        verifying_key,
        prefix,
        prefix_nbits: parsed.prefix_nbits,
        social_distance: parsed.social_distance,
    })
}
