use std::time::Duration;

use crate::classify::Classifier;
use crate::dedup::{DuplicateFilter, DuplicateStatus};
use crate::packet::header::{Header, EPSILON, MESSAGE_TYPE_MGMT, UNKNOWN_SOCIAL_TIER};
use crate::packet::mgmt::mgmt_type;
use crate::packet::{fingerprint, is_valid_message, split_signature};
use crate::priority::compute_priority;
use crate::rate::RateAccounter;
use crate::scope::Scope;
use crate::social::{SocialTable, Snapshot};

/// Result of dispatching one message.
pub struct DispatchOutcome {
    pub scope: Scope,
    pub priority: u32,
    pub packet: Vec<u8>,
    /// Why a `Drop` happened, or why a non-`Drop` scope still reflects a
    /// suppressed duplicate. Purely observational — metrics and logging
    /// only, never consulted by the dispatcher itself.
    pub reason: DropReason,
}

/// Reason tag attached to a `DispatchOutcome`, for the ambient stack's
/// "drops per reason" / "duplicate hits" counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    None,
    Invalid,
    Duplicate,
    ManagementDrop,
}

/// The synchronous, I/O-free dispatcher.
///
/// Owns the three pieces of per-process state the main loop threads through
/// every call: the duplicate filter, the management classifier (and its
/// trace timestamp), and the rate accounter. The social table snapshot is
/// passed in by reference instead, since the main loop may swap it
/// concurrently with an in-flight dispatch.
pub struct Dispatcher {
    dedup: DuplicateFilter,
    classifier: Classifier,
    rate: RateAccounter,
}

impl Dispatcher {
    pub fn new(
        dedup_window: Duration,
        dedup_capacity: usize,
        trace_grace: Duration,
        rate_window: Duration,
    ) -> Self {
        Self {
            dedup: DuplicateFilter::new(dedup_window, dedup_capacity),
            classifier: Classifier::new(trace_grace),
            rate: RateAccounter::new(rate_window),
        }
    }

    /// Dispatch one message received on a pipe.
    ///
    /// `is_local` is `p ∈ {0, 1}` — the main loop decides this from the
    /// pipe index, not from anything in the packet.
    pub fn dispatch(
        &mut self,
        mut packet: Vec<u8>,
        is_local: bool,
        claimed_priority: u32,
        social: &Snapshot,
    ) -> DispatchOutcome {
        // 1. Validate.
        if !is_valid_message(&packet) {
            return DispatchOutcome { scope: Scope::Drop, priority: 0, packet, reason: DropReason::Invalid };
        }

        // 3. Reset priority for non-local submissions; the submitter's
        // value is untrusted.
        let mut priority = if is_local { claimed_priority } else { EPSILON as u32 };

        // 4. Duplicate check.
        let fp = fingerprint(&packet);
        if let DuplicateStatus::Duplicate { .. } = self.dedup.record(fp) {
            let scope = if is_local { Scope::Local } else { Scope::Drop };
            let reason = if scope == Scope::Drop { DropReason::Duplicate } else { DropReason::None };
            return DispatchOutcome { scope, priority, packet, reason };
        }

        let mut header = Header::parse(&packet);

        // 5. Management dispatch.
        if header.message_type == MESSAGE_TYPE_MGMT {
            let hs = crate::packet::header::HEADER_SIZE
                + crate::packet::transport::variable_region_len(header.transport);
            let mtype = mgmt_type(&packet[hs..]);
            let (scope, override_priority) = self.classifier.classify(mtype, is_local);
            if let Some(p) = override_priority {
                priority = p;
            }
            let reason = if scope == Scope::Drop { DropReason::ManagementDrop } else { DropReason::None };
            return DispatchOutcome { scope, priority, packet, reason };
        }

        // 6. Local shortcut.
        if is_local {
            return DispatchOutcome { scope: Scope::All, priority, packet, reason: DropReason::None };
        }

        // 7. Increment hop count, saturating at 255.
        header.hops = header.hops.saturating_add(1);
        header.write_into(&mut packet);

        // 8. Hop exhaustion.
        if header.hops >= header.max_hops {
            return DispatchOutcome { scope: Scope::Local, priority: 0, packet, reason: DropReason::None };
        }

        // 9. Preliminary priority, using the global largest_rate as the
        // unauthenticated source's assumed rate: with no source identity to
        // look up yet, the worst-case assumption is that this sender is
        // already pushing at the busiest rate seen from anyone, i.e. a
        // fraction of 1.0 — unless no traffic has been observed at all, in
        // which case there is nothing to be maximally loaded relative to.
        let preliminary_rate_fraction = if self.rate.largest_rate() > 0.0 { 1.0 } else { 0.0 };
        let preliminary = compute_priority(
            false,
            packet.len(),
            header.src_nbits,
            header.dst_nbits,
            header.hops,
            header.max_hops,
            UNKNOWN_SOCIAL_TIER,
            preliminary_rate_fraction,
        );

        // 10. Signature handling.
        if header.sig_algo == crate::packet::header::SIG_ALGO_NONE {
            return DispatchOutcome { scope: Scope::All, priority: preliminary, packet, reason: DropReason::None };
        }

        let Some((signed_region, sig)) = split_signature(&packet, &header) else {
            return DispatchOutcome { scope: Scope::All, priority: preliminary, packet, reason: DropReason::None };
        };

        let (social_distance, valid) = SocialTable::connection(
            social,
            signed_region,
            header.source,
            header.src_nbits,
            header.sig_algo,
            sig,
        );

        if !valid {
            return DispatchOutcome { scope: Scope::All, priority: preliminary, packet, reason: DropReason::None };
        }

        let rate_fraction = self.rate.track(header.source, header.src_nbits, packet.len());
        let final_priority = compute_priority(
            false,
            packet.len(),
            header.src_nbits,
            header.dst_nbits,
            header.hops,
            header.max_hops,
            social_distance,
            rate_fraction,
        );

        DispatchOutcome { scope: Scope::All, priority: final_priority, packet, reason: DropReason::None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::header::{HEADER_SIZE, MESSAGE_TYPE_DATA, SIG_ALGO_NONE};
    use crate::packet::mgmt;

    fn empty_snapshot() -> Snapshot {
        Snapshot::empty(5)
    }

    fn data_packet(hops: u8, max_hops: u8) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0] = 4;
        buf[1] = MESSAGE_TYPE_DATA;
        buf[2] = hops;
        buf[3] = max_hops;
        buf[6] = SIG_ALGO_NONE;
        buf
    }

    fn mgmt_packet(mtype: u8) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0] = 4;
        buf[1] = MESSAGE_TYPE_MGMT;
        buf[6] = SIG_ALGO_NONE;
        buf.push(mtype);
        buf
    }

    fn new_dispatcher() -> Dispatcher {
        Dispatcher::new(Duration::from_secs(60), 100_000, Duration::from_secs(10), Duration::from_secs(1))
    }

    #[test]
    fn local_data_packet_forwards_with_submitted_priority() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let out = d.dispatch(data_packet(0, 5), true, 100, &snapshot);
        assert_eq!(out.scope, Scope::All);
        assert_eq!(out.priority, 100);
        assert_eq!(out.packet[2], 0); // hops unchanged for local
    }

    #[test]
    fn remote_duplicate_within_window_is_dropped() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let first = data_packet(0, 5);
        d.dispatch(first.clone(), false, 0, &snapshot);
        let out = d.dispatch(first, false, 0, &snapshot);
        assert_eq!(out.scope, Scope::Drop);
    }

    #[test]
    fn remote_packet_at_max_hops_is_local_only() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let out = d.dispatch(data_packet(4, 5), false, 0, &snapshot);
        assert_eq!(out.scope, Scope::Local);
        assert_eq!(out.packet[2], 5);
    }

    #[test]
    fn remote_packet_forwards_with_incremented_hops() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let out = d.dispatch(data_packet(1, 5), false, 0, &snapshot);
        assert_eq!(out.scope, Scope::All);
        assert_eq!(out.packet[2], 2);
    }

    #[test]
    fn hop_count_saturates_at_255() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let out = d.dispatch(data_packet(255, 255), false, 0, &snapshot);
        assert_eq!(out.packet[2], 255);
    }

    #[test]
    fn beacon_mgmt_produces_no_output() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let out = d.dispatch(mgmt_packet(mgmt::BEACON), false, 0, &snapshot);
        assert_eq!(out.scope, Scope::Drop);
    }

    #[test]
    fn invalid_packet_is_dropped() {
        let mut d = new_dispatcher();
        let snapshot = empty_snapshot();
        let out = d.dispatch(vec![0u8; 2], false, 0, &snapshot);
        assert_eq!(out.scope, Scope::Drop);
    }
}
