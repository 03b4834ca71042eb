//! Reassembly store: the single source of truth for in-flight messages.
//!
//! The store tracks partially received messages by identity and exposes
//! exactly two operations, both serialized behind one long-lived
//! exclusive lock: [`Store::ingest`] and [`Store::sweep`]. Ingestion is
//! O(1) amortized per segment; a sweep is O(in-flight identity count).
//!
//! A state is destroyed exactly once, by the sweep, either on
//! completion or on inactivity timeout. A late segment arriving after
//! eviction starts a brand-new state; there is no replay protection
//! across the eviction boundary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use courier_protocol::{MessageId, Segment};

use crate::config::EngineConfig;

/// Internal state for one partially received message.
///
/// `expected`, `sender`, and `sent_at` are fixed when the first segment
/// for an identity arrives; any later segment disagreeing with them is
/// rejected, never merged.
#[derive(Debug)]
struct ReassemblyState {
    /// Chunks received so far, keyed by ordinal.
    received: HashMap<u32, String>,
    /// Total number of segments expected.
    expected: u32,
    /// Arrival time of the most recent accepted segment.
    last_arrival: Instant,
    sender: String,
    sent_at: DateTime<Utc>,
}

impl ReassemblyState {
    /// Create state from the first received segment of an identity.
    fn new(segment: &Segment, now: Instant) -> Self {
        let mut received = HashMap::with_capacity(segment.total() as usize);
        received.insert(segment.ordinal(), segment.payload().to_string());

        Self {
            received,
            expected: segment.total(),
            last_arrival: now,
            sender: segment.sender().to_string(),
            sent_at: segment.sent_at(),
        }
    }

    /// Check the segment against the metadata fixed at first arrival.
    fn matches(&self, segment: &Segment) -> bool {
        self.expected == segment.total()
            && self.sender == segment.sender()
            && self.sent_at == segment.sent_at()
    }

    /// Store a chunk. Returns `false` for a duplicate ordinal; the
    /// first-received copy is kept and the arrival clock is untouched.
    fn insert(&mut self, segment: &Segment, now: Instant) -> bool {
        if self.received.contains_key(&segment.ordinal()) {
            return false;
        }
        self.received.insert(segment.ordinal(), segment.payload().to_string());
        self.last_arrival = now;
        true
    }

    fn is_complete(&self) -> bool {
        self.received.len() == self.expected as usize
    }

    fn is_stale(&self, now: Instant, inactivity_limit: Duration) -> bool {
        now.duration_since(self.last_arrival) > inactivity_limit
    }

    /// Concatenate the chunks in ordinal order, independent of arrival
    /// order.
    fn assemble(&self) -> String {
        let mut payload = String::with_capacity(self.received.values().map(String::len).sum());
        for ordinal in 1..=self.expected {
            if let Some(chunk) = self.received.get(&ordinal) {
                payload.push_str(chunk);
            }
        }
        payload
    }
}

/// Result of offering one segment to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The chunk was stored.
    Accepted {
        /// Distinct ordinals received so far.
        received: usize,
        /// Total segments expected.
        expected: u32,
    },
    /// The ordinal was already present; first-received copy kept.
    Duplicate,
    /// Segment metadata disagrees with the state established at first
    /// arrival; nothing was mutated.
    MetadataConflict,
    /// The store is at its in-flight capacity; the segment was dropped.
    AtCapacity,
}

/// Terminal resolution of one in-flight message, produced by a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// All segments arrived; the payload is reassembled in ordinal
    /// order.
    Complete {
        /// Name of the sending user.
        sender: String,
        /// Original send time of the message.
        sent_at: DateTime<Utc>,
        /// The reassembled payload.
        payload: String,
    },
    /// The message went inactive before completing.
    TimedOut {
        /// Name of the sending user.
        sender: String,
        /// Original send time of the message.
        sent_at: DateTime<Utc>,
        /// Total segments that were expected.
        expected: u32,
        /// Distinct ordinals actually received.
        received: usize,
    },
}

/// Counters describing store activity.
///
/// Used for monitoring and for invariant checks in tests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Identities currently in flight.
    pub in_flight: usize,
    /// Segments accepted into reassembly state (lifetime counter).
    pub segments_accepted: u64,
    /// Duplicate ordinals ignored (lifetime counter).
    pub duplicates_ignored: u64,
    /// Segments rejected for metadata conflicts (lifetime counter).
    pub metadata_conflicts: u64,
    /// Segments dropped at the in-flight capacity cap (lifetime counter).
    pub capacity_drops: u64,
    /// Messages resolved complete (lifetime counter).
    pub messages_completed: u64,
    /// Messages resolved as timed out (lifetime counter).
    pub messages_timed_out: u64,
}

/// Store internals; only ever touched with the lock held.
#[derive(Debug)]
struct AssemblyMap {
    in_flight: HashMap<MessageId, ReassemblyState>,
    inactivity_limit: Duration,
    max_in_flight: usize,
    stats: EngineStats,
}

impl AssemblyMap {
    fn ingest(&mut self, segment: &Segment, now: Instant) -> IngestOutcome {
        let id = segment.id();

        if let Some(state) = self.in_flight.get_mut(&id) {
            if !state.matches(segment) {
                self.stats.metadata_conflicts += 1;
                return IngestOutcome::MetadataConflict;
            }
            if !state.insert(segment, now) {
                self.stats.duplicates_ignored += 1;
                return IngestOutcome::Duplicate;
            }
            self.stats.segments_accepted += 1;
            return IngestOutcome::Accepted {
                received: state.received.len(),
                expected: state.expected,
            };
        }

        if self.in_flight.len() >= self.max_in_flight {
            self.stats.capacity_drops += 1;
            return IngestOutcome::AtCapacity;
        }

        let state = ReassemblyState::new(segment, now);
        let expected = state.expected;
        self.in_flight.insert(id, state);
        self.stats.segments_accepted += 1;
        self.stats.in_flight = self.in_flight.len();
        IngestOutcome::Accepted {
            received: 1,
            expected,
        }
    }

    fn sweep(&mut self, now: Instant) -> Vec<MessageOutcome> {
        // Classification and eviction happen in the same pass, so a
        // state can never be seen complete by one sweep and timed out
        // by a later one. Completion wins when both conditions hold.
        let resolved: Vec<MessageId> = self
            .in_flight
            .iter()
            .filter(|(_, state)| {
                state.is_complete() || state.is_stale(now, self.inactivity_limit)
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut outcomes = Vec::with_capacity(resolved.len());
        for id in resolved {
            let Some(state) = self.in_flight.remove(&id) else {
                continue;
            };
            if state.is_complete() {
                self.stats.messages_completed += 1;
                outcomes.push(MessageOutcome::Complete {
                    payload: state.assemble(),
                    sender: state.sender,
                    sent_at: state.sent_at,
                });
            } else {
                self.stats.messages_timed_out += 1;
                outcomes.push(MessageOutcome::TimedOut {
                    received: state.received.len(),
                    expected: state.expected,
                    sender: state.sender,
                    sent_at: state.sent_at,
                });
            }
        }

        self.stats.in_flight = self.in_flight.len();
        outcomes
    }
}

/// Shared handle to the reassembly store.
///
/// Constructed once per process and cloned by reference into every
/// component that needs it; all clones share the same long-lived lock,
/// which is held for the full duration of each `ingest` or `sweep`
/// pass. Result dispatch happens outside the lock.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<AssemblyMap>>,
}

impl Store {
    /// Create an empty store from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AssemblyMap {
                in_flight: HashMap::new(),
                inactivity_limit: config.inactivity_limit,
                max_in_flight: config.max_in_flight,
                stats: EngineStats::default(),
            })),
        }
    }

    /// Offer one validated segment to the store.
    ///
    /// If no state exists for the segment's identity, one is created
    /// and seeded from this segment. A segment disagreeing with the
    /// established metadata is rejected without mutation; a duplicate
    /// ordinal is ignored. Otherwise the chunk is stored and the
    /// identity's arrival clock is refreshed.
    pub fn ingest(&self, segment: &Segment) -> IngestOutcome {
        self.inner.lock().ingest(segment, Instant::now())
    }

    /// Resolve and evict every in-flight message that is complete or
    /// has been inactive longer than the configured limit.
    ///
    /// Both classifications happen atomically within one pass.
    pub fn sweep(&self, now: Instant) -> Vec<MessageOutcome> {
        self.inner.lock().sweep(now)
    }

    /// Number of identities currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    /// Snapshot of the store's activity counters.
    pub fn stats(&self) -> EngineStats {
        self.inner.lock().stats.clone()
    }

    #[cfg(test)]
    fn ingest_at(&self, segment: &Segment, now: Instant) -> IngestOutcome {
        self.inner.lock().ingest(segment, now)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Store")
            .field("in_flight", &inner.in_flight.len())
            .field("inactivity_limit", &inner.inactivity_limit)
            .field("max_in_flight", &inner.max_in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 21, 2, 34, 48).unwrap()
    }

    fn segment(ordinal: u32, total: u32, payload: &str) -> Segment {
        Segment::new(ordinal, total, "alice".into(), ts(), payload.into()).unwrap()
    }

    fn store() -> Store {
        Store::new(&EngineConfig::default())
    }

    #[test]
    fn test_first_segment_creates_state() {
        let store = store();
        let outcome = store.ingest(&segment(2, 3, "b"));

        assert_eq!(
            outcome,
            IngestOutcome::Accepted {
                received: 1,
                expected: 3
            }
        );
        assert_eq!(store.in_flight(), 1);
    }

    #[test]
    fn test_all_ordinal_permutations_assemble_identically() {
        let permutations: [[u32; 3]; 6] = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        let chunks = ["first-", "second-", "third"];

        for order in permutations {
            let store = store();
            for ordinal in order {
                store.ingest(&segment(ordinal, 3, chunks[ordinal as usize - 1]));
            }

            let outcomes = store.sweep(Instant::now());
            assert_eq!(outcomes.len(), 1, "order {order:?}");
            match &outcomes[0] {
                MessageOutcome::Complete { payload, .. } => {
                    assert_eq!(payload, "first-second-third", "order {order:?}");
                }
                other => panic!("expected Complete, got {other:?}"),
            }
            assert_eq!(store.in_flight(), 0);
        }
    }

    #[test]
    fn test_duplicate_ordinal_is_noop_keeping_first_copy() {
        let store = store();
        store.ingest(&segment(1, 2, "original"));

        let outcome = store.ingest(&segment(1, 2, "imposter"));
        assert_eq!(outcome, IngestOutcome::Duplicate);

        store.ingest(&segment(2, 2, "-tail"));
        let outcomes = store.sweep(Instant::now());
        match &outcomes[0] {
            MessageOutcome::Complete { payload, .. } => assert_eq!(payload, "original-tail"),
            other => panic!("expected Complete, got {other:?}"),
        }

        let stats = store.stats();
        assert_eq!(stats.duplicates_ignored, 1);
        assert_eq!(stats.segments_accepted, 2);
    }

    #[test]
    fn test_duplicate_does_not_refresh_arrival_clock() {
        let store = store();
        let start = Instant::now();
        store.ingest_at(&segment(1, 2, "a"), start);

        // A duplicate long after the first copy must not keep the
        // message alive.
        let later = start + Duration::from_secs(10);
        store.ingest_at(&segment(1, 2, "a"), later);

        let outcomes = store.sweep(later);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], MessageOutcome::TimedOut { .. }));
    }

    #[test]
    fn test_metadata_conflict_rejected_without_mutation() {
        let store = store();
        store.ingest(&segment(1, 3, "a"));

        // Same identity, different declared total.
        let conflicting = Segment::new(2, 4, "alice".into(), ts(), "b".into()).unwrap();
        let outcome = store.ingest(&conflicting);
        assert_eq!(outcome, IngestOutcome::MetadataConflict);

        // The established state is untouched and still expects 3.
        let accepted = store.ingest(&segment(2, 3, "b"));
        assert_eq!(
            accepted,
            IngestOutcome::Accepted {
                received: 2,
                expected: 3
            }
        );
        assert_eq!(store.stats().metadata_conflicts, 1);
    }

    #[test]
    fn test_never_completes_with_fewer_than_expected() {
        let store = store();
        store.ingest(&segment(1, 4, "a"));
        store.ingest(&segment(2, 4, "b"));
        store.ingest(&segment(4, 4, "d"));

        // Not complete, not yet stale: left untouched.
        assert!(store.sweep(Instant::now()).is_empty());
        assert_eq!(store.in_flight(), 1);
    }

    #[test]
    fn test_timeout_cites_expected_and_received_counts() {
        let store = store();
        let start = Instant::now();
        store.ingest_at(&segment(1, 4, "a"), start);
        store.ingest_at(&segment(3, 4, "c"), start);

        let after_limit = start + Duration::from_secs(4);
        let outcomes = store.sweep(after_limit);

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            MessageOutcome::TimedOut {
                sender,
                expected,
                received,
                ..
            } => {
                assert_eq!(sender, "alice");
                assert_eq!(*expected, 4);
                assert_eq!(*received, 2);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(store.in_flight(), 0);
        assert_eq!(store.stats().messages_timed_out, 1);
    }

    #[test]
    fn test_completion_wins_over_simultaneous_timeout() {
        let store = store();
        let start = Instant::now();
        store.ingest_at(&segment(1, 2, "he"), start);
        store.ingest_at(&segment(2, 2, "llo"), start);

        // Stale AND complete: an arrived full message is never
        // discarded as a false timeout.
        let long_after = start + Duration::from_secs(60);
        let outcomes = store.sweep(long_after);

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            MessageOutcome::Complete { payload, .. } => assert_eq!(payload, "hello"),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_exactly_at_inactivity_limit_is_not_stale() {
        let config = EngineConfig::default();
        let store = Store::new(&config);
        let start = Instant::now();
        store.ingest_at(&segment(1, 2, "a"), start);

        // The limit is exclusive: now - last_arrival must exceed it.
        let outcomes = store.sweep(start + config.inactivity_limit);
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_sweep_resolves_each_identity_independently() {
        let store = store();
        let start = Instant::now();

        store.ingest_at(&segment(1, 1, "done"), start);
        store.ingest_at(&segment(1, 2, "stale"), start);
        let fresh = Segment::new(1, 2, "bob".into(), ts(), "fresh".into()).unwrap();

        let later = start + Duration::from_secs(4);
        store.ingest_at(&fresh, later);

        let outcomes = store.sweep(later);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, MessageOutcome::Complete { .. })));
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, MessageOutcome::TimedOut { .. })));
        // Bob's fresh message is still in flight.
        assert_eq!(store.in_flight(), 1);
    }

    #[test]
    fn test_late_segment_after_eviction_starts_fresh_state() {
        let store = store();
        let start = Instant::now();
        store.ingest_at(&segment(1, 2, "a"), start);

        let later = start + Duration::from_secs(4);
        assert_eq!(store.sweep(later).len(), 1);

        // Same identity arrives again: brand-new state, no replay
        // protection across the eviction boundary.
        let outcome = store.ingest_at(&segment(2, 2, "b"), later);
        assert_eq!(
            outcome,
            IngestOutcome::Accepted {
                received: 1,
                expected: 2
            }
        );
        assert_eq!(store.in_flight(), 1);
    }

    #[test]
    fn test_in_flight_capacity_cap() {
        let config = EngineConfig::builder().with_max_in_flight(2).build();
        let store = Store::new(&config);

        store.ingest(&Segment::new(1, 2, "a".into(), ts(), "x".into()).unwrap());
        store.ingest(&Segment::new(1, 2, "b".into(), ts(), "x".into()).unwrap());

        let third = Segment::new(1, 2, "c".into(), ts(), "x".into()).unwrap();
        assert_eq!(store.ingest(&third), IngestOutcome::AtCapacity);

        // Segments for identities already in flight are still accepted.
        let follow_up = Segment::new(2, 2, "a".into(), ts(), "y".into()).unwrap();
        assert!(matches!(
            store.ingest(&follow_up),
            IngestOutcome::Accepted { .. }
        ));
        assert_eq!(store.stats().capacity_drops, 1);
    }

    #[test]
    fn test_identities_with_different_timestamps_stay_distinct() {
        let store = store();
        let other_time = ts() + chrono::Duration::nanoseconds(1);

        store.ingest(&segment(1, 2, "a"));
        let near_twin = Segment::new(1, 2, "alice".into(), other_time, "a".into()).unwrap();
        let outcome = store.ingest(&near_twin);

        assert!(matches!(outcome, IngestOutcome::Accepted { .. }));
        assert_eq!(store.in_flight(), 2);
    }
}
