//! Property-based tests for protocol components.
//!
//! These tests verify transport invariants hold for arbitrary inputs:
//!
//! - Splitting produces exactly `ceil(length / size)` chunks
//! - Chunk concatenation reproduces the payload byte-for-byte
//! - Segment wire encoding round-trips through JSON

use proptest::prelude::*;

use crate::segment::Segment;
use crate::split::{segments_for, split_payload};

use chrono::{TimeZone, Utc};

proptest! {
    /// Splitting any ASCII payload reproduces it exactly on concat.
    #[test]
    fn split_roundtrip_ascii(
        payload in "[ -~]{0,1000}",
        size in 1usize..=200,
    ) {
        let chunks = split_payload(&payload, size).unwrap();
        prop_assert_eq!(chunks.len(), payload.len().div_ceil(size));
        prop_assert!(chunks.iter().all(|c| c.len() <= size));
        prop_assert_eq!(chunks.concat(), payload);
    }

    /// Every chunk except possibly the last is exactly `size` bytes.
    #[test]
    fn split_chunks_are_full_except_last(
        payload in "[ -~]{1,500}",
        size in 1usize..=64,
    ) {
        let chunks = split_payload(&payload, size).unwrap();
        for chunk in &chunks[..chunks.len() - 1] {
            prop_assert_eq!(chunk.len(), size);
        }
    }

    /// Segments carry contiguous 1-based ordinals and a shared identity.
    #[test]
    fn segments_cover_payload_in_order(
        payload in "[ -~]{1,500}",
        size in 1usize..=64,
    ) {
        let sent_at = Utc.with_ymd_and_hms(2024, 5, 21, 2, 34, 48).unwrap();
        let segments = segments_for("alice", sent_at, &payload, size).unwrap();

        let total = segments.len() as u32;
        let mut rebuilt = String::new();
        for (i, segment) in segments.iter().enumerate() {
            prop_assert_eq!(segment.ordinal(), i as u32 + 1);
            prop_assert_eq!(segment.total(), total);
            rebuilt.push_str(segment.payload());
        }
        prop_assert_eq!(rebuilt, payload);
    }

    /// Valid segments survive a JSON round trip unchanged.
    #[test]
    fn segment_json_roundtrip(
        ordinal in 1u32..=16,
        extra in 0u32..=16,
        payload in "[ -~]{0,200}",
        nanos in 0i64..1_000_000_000,
    ) {
        let sent_at = Utc.with_ymd_and_hms(2024, 5, 21, 2, 34, 48).unwrap()
            + chrono::Duration::nanoseconds(nanos);
        let segment =
            Segment::new(ordinal, ordinal + extra, "alice".into(), sent_at, payload).unwrap();

        let json = serde_json::to_string(&segment).unwrap();
        let back: Segment = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, segment);
    }
}
