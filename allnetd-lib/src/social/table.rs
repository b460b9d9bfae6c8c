use std::path::PathBuf;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use ed25519_dalek::{Signature, Verifier};
use std::sync::Arc;
use tracing::{debug, info};

use crate::packet::header::{SIG_ALGO_ED25519, UNKNOWN_SOCIAL_TIER};
use crate::social::contacts::{load_contacts_dir, Contact};
use crate::telemetry::Metrics;

/// An immutable snapshot of the social table.
///
/// Bounded to `max_bytes` contacts' worth of footprint and `max_checks`
/// signature verifications per lookup; both limits exist so a large or
/// adversarial contact list cannot turn `connection` into an unbounded
/// scan on the single worker thread.
pub struct Snapshot {
    contacts: Vec<Contact>,
    max_checks: usize,
}

/// Rough per-entry footprint used to bound a snapshot to `max_bytes`: a
/// 32-byte verifying key plus the other small fixed fields, rounded up.
const BYTES_PER_CONTACT: usize = 64;

impl Snapshot {
    pub(crate) fn empty(max_checks: usize) -> Self {
        Self { contacts: Vec::new(), max_checks }
    }

    fn bounded(mut contacts: Vec<Contact>, max_bytes: usize, max_checks: usize) -> Self {
        let cap = max_bytes / BYTES_PER_CONTACT;
        if contacts.len() > cap {
            contacts.truncate(cap);
        }
        Self { contacts, max_checks }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// Owns the atomically-swapped social table snapshot.
pub struct SocialTable {
    snapshot: ArcSwap<Snapshot>,
    max_bytes: usize,
    max_checks: usize,
    contacts_dir: PathBuf,
}

impl SocialTable {
    /// `init(max_bytes, max_checks)`: allocate an empty table with the
    /// stated budgets.
    pub fn init(max_bytes: usize, max_checks: usize, contacts_dir: PathBuf) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::empty(max_checks)),
            max_bytes,
            max_checks,
            contacts_dir,
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// `update(period)`: rebuild from the contact directory on a blocking
    /// task so a large contact list never stalls the worker, then swap the
    /// new snapshot in atomically. Returns the next deadline.
    pub async fn update(&self, period: Duration, metrics: Option<&Metrics>) -> Instant {
        let dir = self.contacts_dir.clone();
        let max_bytes = self.max_bytes;
        let max_checks = self.max_checks;

        let started = Instant::now();
        let snapshot = tokio::task::spawn_blocking(move || {
            let contacts = load_contacts_dir(&dir);
            Snapshot::bounded(contacts, max_bytes, max_checks)
        })
        .await;

        match snapshot {
            Ok(snapshot) => {
                info!(entries = snapshot.len(), "social table rebuilt");
                if let Some(metrics) = metrics {
                    metrics.social_rebuilds_total.inc();
                    metrics.social_rebuild_seconds.observe(started.elapsed().as_secs_f64());
                    metrics.social_table_entries.set(snapshot.len() as i64);
                }
                self.snapshot.store(Arc::new(snapshot));
            }
            Err(e) => {
                debug!(error = %e, "social table rebuild task failed, keeping previous snapshot");
            }
        }

        Instant::now() + period
    }

    /// `connection(...)`: search `snapshot` for a key whose prefix matches
    /// `src_address` in its first `src_nbits` bits, verifying the signature
    /// against each match up to the snapshot's check budget.
    pub fn connection(
        snapshot: &Snapshot,
        signed_region: &[u8],
        src_address: [u8; 8],
        src_nbits: u8,
        sig_algo: u8,
        sig: &[u8],
    ) -> (u8, bool) {
        if sig_algo != SIG_ALGO_ED25519 {
            return (UNKNOWN_SOCIAL_TIER, false);
        }
        let Ok(sig_bytes): Result<[u8; 64], _> = sig.try_into() else {
            return (UNKNOWN_SOCIAL_TIER, false);
        };
        let signature = Signature::from_bytes(&sig_bytes);

        let mut checks = 0usize;
        for contact in &snapshot.contacts {
            if checks >= snapshot.max_checks {
                break;
            }
            if !prefix_matches(&contact.prefix, contact.prefix_nbits, &src_address, src_nbits) {
                continue;
            }
            checks += 1;
            if contact.verifying_key.verify(signed_region, &signature).is_ok() {
                return (contact.social_distance, true);
            }
        }
        (UNKNOWN_SOCIAL_TIER, false)
    }
}

/// True iff `a`'s first `min(a_nbits, b_nbits)` bits equal `b`'s.
///
/// A contact's declared prefix width and the packet's own `src_nbits` can
/// disagree; only the bits both sides claim are meaningful can be compared.
fn prefix_matches(a: &[u8; 8], a_nbits: u8, b: &[u8; 8], b_nbits: u8) -> bool {
    let nbits = a_nbits.min(b_nbits).min(64) as usize;
    let full_bytes = nbits / 8;
    if a[..full_bytes] != b[..full_bytes] {
        return false;
    }
    let rem = nbits % 8;
    if rem == 0 {
        return true;
    }
    let mask = 0xFFu8 << (8 - rem);
    (a[full_bytes] & mask) == (b[full_bytes] & mask)
}
