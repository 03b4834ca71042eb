//! Result records delivered to the application level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final result record for one logical message.
///
/// Exactly two kinds of record ever leave the transport: a fully
/// reassembled payload, or an explicit timeout failure. Everything else
/// (malformed segments, duplicates, metadata conflicts) is handled
/// internally and produces no record at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Name of the sending user.
    pub sender: String,
    /// Original send time of the message.
    #[serde(rename = "send_time")]
    pub sent_at: DateTime<Utc>,
    /// Reassembled payload; empty on failure.
    pub payload: String,
    /// Whether this record reports a failure. Omitted on the wire when
    /// false.
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
    /// Human-readable failure description; absent on success.
    #[serde(rename = "error_msg", default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl DeliveryReport {
    /// Build a success record for a fully reassembled message.
    pub fn complete(sender: String, sent_at: DateTime<Utc>, payload: String) -> Self {
        Self {
            sender,
            sent_at,
            payload,
            error: false,
            error_msg: None,
        }
    }

    /// Build a failure record for a message that timed out.
    ///
    /// The failure message cites both the expected and the received
    /// segment counts.
    pub fn timed_out(
        sender: String,
        sent_at: DateTime<Utc>,
        expected: u32,
        received: usize,
    ) -> Self {
        Self {
            sender,
            sent_at,
            payload: String::new(),
            error: true,
            error_msg: Some(format!(
                "message timed out: expected {expected} segments, received {received}"
            )),
        }
    }
}
