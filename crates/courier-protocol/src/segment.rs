//! Wire-level segment types.
//!
//! A [`Segment`] is the unit the channel level actually carries: one
//! ordinal-tagged slice of a logical message, plus the metadata needed
//! to reassemble the message on the far side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Identity of one logical multi-segment message.
///
/// A message is named by its sender and its send timestamp. The
/// timestamp carries nanosecond precision, which is what keeps rapid
/// successive messages from the same sender distinct. Two segments with
/// equal identity belong to the same reassembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId {
    /// Name of the sending user.
    pub sender: String,
    /// Time the message was sent, as reported by the sender.
    pub sent_at: DateTime<Utc>,
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.sender, self.sent_at.to_rfc3339())
    }
}

/// One ordinal-tagged chunk of a larger logical message.
///
/// Ordinals are 1-based: a message split into `total` segments carries
/// ordinals `1..=total`. The sender and send time are repeated on every
/// segment so each one is independently routable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based position of this segment within its message.
    #[serde(rename = "segment_number")]
    ordinal: u32,
    /// Total number of segments in the message.
    #[serde(rename = "total_segments")]
    total: u32,
    /// Name of the sending user.
    sender: String,
    /// Time the message was sent; nanosecond precision.
    #[serde(rename = "send_time")]
    sent_at: DateTime<Utc>,
    /// This segment's slice of the message payload.
    payload: String,
}

impl Segment {
    /// Create a new segment.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (see [`Segment::validate`]).
    pub fn new(
        ordinal: u32,
        total: u32,
        sender: String,
        sent_at: DateTime<Utc>,
        payload: String,
    ) -> Result<Self> {
        let segment = Self {
            ordinal,
            total,
            sender,
            sent_at,
            payload,
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Validate the segment's metadata.
    ///
    /// Deserialized segments must be validated before they are allowed
    /// anywhere near reassembly state.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `total` is 0
    /// - `ordinal` is outside `[1, total]`
    /// - the sender is empty
    /// - the send timestamp is the zero value
    pub fn validate(&self) -> Result<()> {
        if self.total == 0 {
            return Err(ProtocolError::ZeroTotal);
        }

        if self.ordinal == 0 || self.ordinal > self.total {
            return Err(ProtocolError::InvalidOrdinal {
                ordinal: self.ordinal,
                total: self.total,
            });
        }

        if self.sender.is_empty() {
            return Err(ProtocolError::EmptySender);
        }

        if self.sent_at == DateTime::<Utc>::UNIX_EPOCH {
            return Err(ProtocolError::ZeroTimestamp);
        }

        Ok(())
    }

    /// Identity of the message this segment belongs to.
    pub fn id(&self) -> MessageId {
        MessageId {
            sender: self.sender.clone(),
            sent_at: self.sent_at,
        }
    }

    /// Check if this is the first segment (ordinal 1).
    pub fn is_first(&self) -> bool {
        self.ordinal == 1
    }

    /// Check if this is the last segment.
    pub fn is_last(&self) -> bool {
        self.ordinal == self.total
    }

    /// Get the 1-based ordinal.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Get the declared total segment count.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Get the sender name.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Get the send timestamp.
    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    /// Get the payload chunk.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Consume the segment and return its payload chunk.
    pub fn into_payload(self) -> String {
        self.payload
    }
}
