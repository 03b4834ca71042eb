//! Error types for protocol operations.

use thiserror::Error;

/// Errors that can occur during protocol operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Segment ordinal is outside `[1, total]`.
    #[error("Invalid segment ordinal: {ordinal} not in [1, {total}]")]
    InvalidOrdinal {
        /// The offending ordinal.
        ordinal: u32,
        /// Total segments the message declares.
        total: u32,
    },

    /// Segment declares zero total segments.
    #[error("Segment declares zero total segments")]
    ZeroTotal,

    /// Sender name is empty.
    #[error("Sender must not be empty")]
    EmptySender,

    /// Send timestamp is the zero value.
    #[error("Send timestamp must not be zero")]
    ZeroTimestamp,

    /// Segment payload exceeds the configured size bound.
    #[error("Segment payload too large: {actual} bytes exceeds maximum {max}")]
    SegmentTooLarge {
        /// Maximum allowed payload bytes.
        max: usize,
        /// Actual payload bytes.
        actual: usize,
    },

    /// A segment boundary falls inside a multi-byte character.
    #[error("Segment boundary at byte {offset} splits a multi-byte character")]
    SplitBoundary {
        /// Byte offset of the misaligned boundary.
        offset: usize,
    },

    /// A segment size of zero was requested for splitting.
    #[error("Segment size must be at least 1 byte")]
    ZeroSegmentSize,
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
