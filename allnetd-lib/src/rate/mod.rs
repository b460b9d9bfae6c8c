mod estimator;
mod rate;

pub use rate::Rate;

use ahash::RandomState;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[inline]
fn hash<T: Hash>(key: T, hasher: &RandomState) -> u64 {
    hasher.hash_one(key)
}

/// Byte-rate tracker keyed by source address prefix.
///
/// Wraps the dual-buffer `Rate` estimator (reused verbatim from the
/// original rate-limiting stack, generalized here from request counts to
/// byte counts) with a running maximum so `track` can report each source's
/// share of the largest rate currently observed, as the priority computer
/// needs.
pub struct RateAccounter {
    rate: Rate,
    largest_bytes_per_sec: AtomicU64,
}

/// Key identifying a source for rate-tracking purposes: the bit prefix of
/// its address, not the full 8-byte address, since `src_nbits` is the only
/// part of the source the protocol guarantees is meaningful.
#[derive(Hash, PartialEq, Eq, Clone, Copy)]
struct SourceKey {
    prefix: [u8; 8],
    nbits: u8,
}

impl SourceKey {
    fn new(src_address: [u8; 8], src_nbits: u8) -> Self {
        let nbits = src_nbits.min(64);
        let mut prefix = src_address;
        let full_bytes = (nbits / 8) as usize;
        let rem_bits = nbits % 8;
        if full_bytes < prefix.len() {
            if rem_bits > 0 {
                let mask = 0xFFu8 << (8 - rem_bits);
                prefix[full_bytes] &= mask;
            } else {
                prefix[full_bytes] = 0;
            }
            for b in prefix.iter_mut().skip(full_bytes + 1) {
                *b = 0;
            }
        }
        Self { prefix, nbits }
    }
}

impl RateAccounter {
    /// `window` is the sliding-window size.
    pub fn new(window: Duration) -> Self {
        Self { rate: Rate::new(window), largest_bytes_per_sec: AtomicU64::new(0) }
    }

    /// Record `size` bytes from `src_address`/`src_nbits` and return this
    /// source's fraction of the largest rate observed across all sources.
    pub fn track(&self, src_address: [u8; 8], src_nbits: u8, size: usize) -> f64 {
        let key = SourceKey::new(src_address, src_nbits);
        self.rate.observe(&key, size as isize);
        let observed = self.rate.rate(&key).max(0.0) as u64;

        let mut current = self.largest_bytes_per_sec.load(Ordering::Relaxed);
        while observed > current {
            match self.largest_bytes_per_sec.compare_exchange_weak(
                current,
                observed,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    current = observed;
                    break;
                }
                Err(actual) => current = actual,
            }
        }

        if current == 0 {
            0.0
        } else {
            (observed as f64 / current as f64).clamp(0.0, 1.0)
        }
    }

    /// Largest byte rate observed across all tracked sources, in bytes per
    /// second, for callers (the dispatcher's pre-verification step) that
    /// need a load signal without attributing it to one source.
    pub fn largest_rate(&self) -> f64 {
        self.largest_bytes_per_sec.load(Ordering::Relaxed) as f64
    }
}
