use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::packet::Fingerprint;

/// Outcome of `DuplicateFilter::record`.
///
/// "age_seconds_or_zero" is ambiguous at the boundary between "brand new
/// entry" and "duplicate seen zero whole seconds ago"; this enum resolves
/// that by carrying a `Duration` rather than a truncated second count, so a
/// duplicate arriving in the same wall-clock second as its first sighting is
/// still reported as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    /// No matching entry, or the matching entry is older than the window;
    /// a fresh entry was inserted.
    Fresh,
    /// A matching entry within the window exists; it was first seen `age`
    /// ago and its timestamp was not refreshed.
    Duplicate { age: Duration },
}

struct Entry {
    first_seen: Instant,
    seq: u64,
}

/// Bounded duplicate filter keyed by packet fingerprint.
///
/// Eviction is least-recent-insertion once `capacity` live entries are
/// reached, backed by an insertion-ordered queue alongside the lookup map —
/// the same "map plus order queue" shape as a textbook LRU, specialized
/// here to never refresh order on a hit, since the filter's whole point is
/// to measure age since *first* sight.
pub struct DuplicateFilter {
    window: Duration,
    capacity: usize,
    map: HashMap<Fingerprint, Entry, ahash::RandomState>,
    order: VecDeque<(u64, Fingerprint)>,
    next_seq: u64,
}

impl DuplicateFilter {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity,
            map: HashMap::with_hasher(ahash::RandomState::new()),
            order: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn record(&mut self, fingerprint: Fingerprint) -> DuplicateStatus {
        self.record_at(fingerprint, Instant::now())
    }

    fn record_at(&mut self, fingerprint: Fingerprint, now: Instant) -> DuplicateStatus {
        if let Some(entry) = self.map.get(&fingerprint) {
            let age = now.saturating_duration_since(entry.first_seen);
            if age < self.window {
                return DuplicateStatus::Duplicate { age };
            }
        }
        self.insert(fingerprint, now);
        DuplicateStatus::Fresh
    }

    fn insert(&mut self, fingerprint: Fingerprint, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.map.insert(fingerprint, Entry { first_seen: now, seq });
        self.order.push_back((seq, fingerprint));
        self.evict_excess();
    }

    fn evict_excess(&mut self) {
        while self.map.len() > self.capacity {
            let Some((seq, fp)) = self.order.pop_front() else { break };
            if let Some(entry) = self.map.get(&fp) {
                if entry.seq == seq {
                    self.map.remove(&fp);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(byte: u8) -> Fingerprint {
        let mut f = [0u8; 32];
        f[0] = byte;
        f
    }

    #[test]
    fn first_sighting_is_fresh() {
        let mut filter = DuplicateFilter::new(Duration::from_secs(60), 10);
        assert_eq!(filter.record(fp(1)), DuplicateStatus::Fresh);
    }

    #[test]
    fn immediate_repeat_is_duplicate_with_zero_age() {
        let mut filter = DuplicateFilter::new(Duration::from_secs(60), 10);
        let now = Instant::now();
        assert_eq!(filter.record_at(fp(1), now), DuplicateStatus::Fresh);
        assert_eq!(
            filter.record_at(fp(1), now),
            DuplicateStatus::Duplicate { age: Duration::ZERO }
        );
    }

    #[test]
    fn timestamp_is_not_refreshed_on_hit() {
        let mut filter = DuplicateFilter::new(Duration::from_secs(60), 10);
        let t0 = Instant::now();
        filter.record_at(fp(1), t0);
        let t1 = t0 + Duration::from_secs(30);
        assert_eq!(
            filter.record_at(fp(1), t1),
            DuplicateStatus::Duplicate { age: Duration::from_secs(30) }
        );
        let t2 = t0 + Duration::from_secs(59);
        assert_eq!(
            filter.record_at(fp(1), t2),
            DuplicateStatus::Duplicate { age: Duration::from_secs(59) }
        );
    }

    #[test]
    fn exactly_window_old_is_not_a_duplicate() {
        let mut filter = DuplicateFilter::new(Duration::from_secs(60), 10);
        let t0 = Instant::now();
        filter.record_at(fp(1), t0);
        let t1 = t0 + Duration::from_secs(60);
        assert_eq!(filter.record_at(fp(1), t1), DuplicateStatus::Fresh);
    }

    #[test]
    fn evicts_least_recently_inserted_past_capacity() {
        let mut filter = DuplicateFilter::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        filter.record_at(fp(1), t0);
        filter.record_at(fp(2), t0);
        filter.record_at(fp(3), t0);
        assert_eq!(filter.map.len(), 2);
        // fp(1) was evicted; re-recording it is Fresh again.
        assert_eq!(filter.record_at(fp(1), t0), DuplicateStatus::Fresh);
        // fp(3) is still tracked.
        assert_eq!(
            filter.record_at(fp(3), t0),
            DuplicateStatus::Duplicate { age: Duration::ZERO }
        );
    }
}
