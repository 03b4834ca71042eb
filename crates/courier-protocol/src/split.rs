//! Payload splitting for the channel level.
//!
//! Splitting is exact byte arithmetic: a payload of `length` bytes and a
//! segment size of `size` produces `ceil(length / size)` chunks, where
//! chunk `i` spans bytes `[i * size, min((i + 1) * size, length))`.
//! Concatenating the chunks in order reproduces the payload exactly.

use chrono::{DateTime, Utc};

use crate::error::{ProtocolError, Result};
use crate::segment::Segment;

/// Split a payload into size-bounded chunks.
///
/// An empty payload produces zero chunks.
///
/// Segment boundaries are byte offsets. Payloads are UTF-8, so a
/// boundary that lands inside a multi-byte character cannot be
/// represented as a chunk of its own; that case is an explicit error
/// rather than silent corruption.
///
/// # Errors
///
/// Returns [`ProtocolError::ZeroSegmentSize`] for a zero segment size,
/// or [`ProtocolError::SplitBoundary`] if a boundary splits a
/// multi-byte character.
///
/// # Example
///
/// ```
/// use courier_protocol::split_payload;
///
/// let chunks = split_payload("hello world", 4).unwrap();
/// assert_eq!(chunks, vec!["hell", "o wo", "rld"]);
/// assert_eq!(chunks.concat(), "hello world");
/// ```
pub fn split_payload(payload: &str, segment_size: usize) -> Result<Vec<String>> {
    if segment_size == 0 {
        return Err(ProtocolError::ZeroSegmentSize);
    }

    let length = payload.len();
    let count = length.div_ceil(segment_size);

    let mut chunks = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * segment_size;
        let end = usize::min(start + segment_size, length);
        let chunk = payload
            .get(start..end)
            .ok_or(ProtocolError::SplitBoundary { offset: end })?;
        chunks.push(chunk.to_string());
    }

    Ok(chunks)
}

/// Split a payload and wrap each chunk in a [`Segment`].
///
/// Ordinals are assigned `1..=n` in payload order; every segment
/// carries the same sender, send time, and total count.
///
/// # Errors
///
/// Returns an error if splitting fails or if the resulting segments
/// fail validation (empty sender, zero timestamp).
pub fn segments_for(
    sender: &str,
    sent_at: DateTime<Utc>,
    payload: &str,
    segment_size: usize,
) -> Result<Vec<Segment>> {
    let chunks = split_payload(payload, segment_size)?;
    let total = chunks.len() as u32;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| Segment::new(i as u32 + 1, total, sender.to_string(), sent_at, chunk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 21, 2, 34, 48).unwrap()
    }

    #[test]
    fn test_split_empty_payload() {
        let chunks = split_payload("", 140).unwrap();
        assert!(chunks.is_empty());
        assert_eq!(chunks.concat(), "");
    }

    #[test]
    fn test_split_single_byte() {
        let chunks = split_payload("a", 140).unwrap();
        assert_eq!(chunks, vec!["a"]);
    }

    #[test]
    fn test_split_boundary_lengths() {
        let size = 8;
        for length in [size - 1, size, size + 1, size * 3] {
            let payload: String = "x".repeat(length);
            let chunks = split_payload(&payload, size).unwrap();

            assert_eq!(chunks.len(), length.div_ceil(size));
            assert!(chunks.iter().all(|c| c.len() <= size));
            assert_eq!(chunks.concat(), payload);
        }
    }

    #[test]
    fn test_split_exact_multiple_has_no_trailing_chunk() {
        let chunks = split_payload(&"x".repeat(280), 140).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 140);
        assert_eq!(chunks[1].len(), 140);
    }

    #[test]
    fn test_split_300_bytes_at_140() {
        let payload: String = "m".repeat(300);
        let chunks = split_payload(&payload, 140).unwrap();

        let lengths: Vec<usize> = chunks.iter().map(String::len).collect();
        assert_eq!(lengths, vec![140, 140, 20]);
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn test_split_zero_segment_size() {
        assert_eq!(
            split_payload("abc", 0),
            Err(ProtocolError::ZeroSegmentSize)
        );
    }

    #[test]
    fn test_split_mid_character_boundary_rejected() {
        // 'é' is 2 bytes; a 3-byte segment size puts the first boundary
        // inside the second 'é'.
        let payload = "éé";
        assert_eq!(
            split_payload(payload, 3),
            Err(ProtocolError::SplitBoundary { offset: 3 })
        );
    }

    #[test]
    fn test_split_multibyte_aligned() {
        let payload = "éééé"; // 8 bytes
        let chunks = split_payload(payload, 4).unwrap();
        assert_eq!(chunks, vec!["éé", "éé"]);
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn test_segments_for_assigns_ordinals() {
        let segments = segments_for("alice", ts(), &"x".repeat(300), 140).unwrap();

        assert_eq!(segments.len(), 3);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.ordinal() as usize, i + 1);
            assert_eq!(segment.total(), 3);
            assert_eq!(segment.sender(), "alice");
            assert_eq!(segment.sent_at(), ts());
        }
    }

    #[test]
    fn test_segments_for_empty_payload() {
        let segments = segments_for("alice", ts(), "", 140).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_segments_for_empty_sender_rejected() {
        let result = segments_for("", ts(), "payload", 140);
        assert_eq!(result, Err(ProtocolError::EmptySender));
    }

    #[test]
    fn test_segments_share_one_identity() {
        let segments = segments_for("alice", ts(), &"x".repeat(300), 140).unwrap();
        let first = segments[0].id();
        assert!(segments.iter().all(|s| s.id() == first));
    }
}
