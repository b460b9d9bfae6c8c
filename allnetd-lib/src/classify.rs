use std::time::{Duration, Instant};

use crate::packet::header::EPSILON;
use crate::packet::mgmt;
use crate::scope::Scope;

/// Management classifier.
///
/// Owns the one piece of state the classifier keeps across calls: the
/// timestamp of the last foreign TRACE_REQ the daemon suppressed in favor
/// of local delivery. Everything else about classification is a pure
/// function of the mgmt_type and whether the packet arrived locally.
pub struct Classifier {
    trace_grace: Duration,
    last_unforwarded_trace: Option<Instant>,
}

impl Classifier {
    pub fn new(trace_grace: Duration) -> Self {
        Self { trace_grace, last_unforwarded_trace: None }
    }

    /// Classify a management packet. Returns the scope and, if the table
    /// calls for it, a priority override that applies regardless of
    /// locality (only TRACE_REPLY and unknown types force one this way;
    /// everything else relies on the dispatcher having already reset
    /// priority to EPSILON for non-local packets).
    pub fn classify(&mut self, mgmt_type: u8, is_local: bool) -> (Scope, Option<u32>) {
        self.classify_at(mgmt_type, is_local, Instant::now())
    }

    fn classify_at(&mut self, mgmt_type: u8, is_local: bool, now: Instant) -> (Scope, Option<u32>) {
        match mgmt_type {
            mgmt::BEACON | mgmt::BEACON_REPLY | mgmt::BEACON_GRANT => (Scope::Drop, None),
            mgmt::PEER_REQUEST | mgmt::PEERS | mgmt::DHT => (Scope::Local, None),
            mgmt::TRACE_REQ => {
                if is_local {
                    self.last_unforwarded_trace = None;
                    (Scope::All, None)
                } else {
                    let within_grace = match self.last_unforwarded_trace {
                        None => true,
                        Some(t) => now.saturating_duration_since(t) <= self.trace_grace,
                    };
                    if within_grace {
                        self.last_unforwarded_trace = Some(now);
                        (Scope::Local, None)
                    } else {
                        (Scope::All, None)
                    }
                }
            }
            mgmt::TRACE_REPLY => (Scope::All, Some(EPSILON as u32)),
            _ => (Scope::All, Some(EPSILON as u32)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacons_are_dropped() {
        let mut c = Classifier::new(Duration::from_secs(10));
        assert_eq!(c.classify(mgmt::BEACON, false).0, Scope::Drop);
        assert_eq!(c.classify(mgmt::BEACON_REPLY, true).0, Scope::Drop);
        assert_eq!(c.classify(mgmt::BEACON_GRANT, false).0, Scope::Drop);
    }

    #[test]
    fn peer_and_dht_are_local_only() {
        let mut c = Classifier::new(Duration::from_secs(10));
        assert_eq!(c.classify(mgmt::PEER_REQUEST, false).0, Scope::Local);
        assert_eq!(c.classify(mgmt::PEERS, false).0, Scope::Local);
        assert_eq!(c.classify(mgmt::DHT, true).0, Scope::Local);
    }

    #[test]
    fn local_trace_req_clears_state_and_forwards() {
        let mut c = Classifier::new(Duration::from_secs(10));
        let t0 = Instant::now();
        c.classify_at(mgmt::TRACE_REQ, false, t0);
        assert!(c.last_unforwarded_trace.is_some());
        let (scope, _) = c.classify_at(mgmt::TRACE_REQ, true, t0);
        assert_eq!(scope, Scope::All);
        assert!(c.last_unforwarded_trace.is_none());
    }

    #[test]
    fn remote_trace_req_suppressed_then_resumes_after_grace() {
        let mut c = Classifier::new(Duration::from_secs(10));
        let t0 = Instant::now();
        let (first, _) = c.classify_at(mgmt::TRACE_REQ, false, t0);
        assert_eq!(first, Scope::Local);

        let (still_suppressed, _) = c.classify_at(mgmt::TRACE_REQ, false, t0 + Duration::from_secs(5));
        assert_eq!(still_suppressed, Scope::Local);

        let (resumed, _) = c.classify_at(mgmt::TRACE_REQ, false, t0 + Duration::from_secs(11));
        assert_eq!(resumed, Scope::All);
    }

    #[test]
    fn trace_reply_forces_minimum_priority() {
        let mut c = Classifier::new(Duration::from_secs(10));
        let (scope, prio) = c.classify(mgmt::TRACE_REPLY, true);
        assert_eq!(scope, Scope::All);
        assert_eq!(prio, Some(EPSILON as u32));
    }

    #[test]
    fn unknown_mgmt_type_forwards_at_minimum_priority() {
        let mut c = Classifier::new(Duration::from_secs(10));
        let (scope, prio) = c.classify(250, false);
        assert_eq!(scope, Scope::All);
        assert_eq!(prio, Some(EPSILON as u32));
    }
}
