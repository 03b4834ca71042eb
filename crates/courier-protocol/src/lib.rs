//! # courier-protocol
//!
//! Wire protocol and message formats for the Courier transport layer.
//!
//! This crate provides:
//! - **Segment**: ordinal-tagged chunk of a larger logical message
//! - **MessageId**: (sender, send time) identity naming one reassembly
//! - **DeliveryReport**: final result record handed to the application level
//! - **Splitting**: size-bounded segmentation of outbound payloads
//!
//! ## Wire Design
//!
//! Segments travel as JSON over the channel level and the message bus.
//! The send timestamp carries nanosecond precision so that rapid
//! successive messages from the same sender remain distinct identities.
//! The transport makes no ordering assumptions: segments may arrive out
//! of order, duplicated, or not at all.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod report;
pub mod segment;
pub mod split;

#[cfg(test)]
mod proptests;

pub use error::{ProtocolError, Result};
pub use report::DeliveryReport;
pub use segment::{MessageId, Segment};
pub use split::{segments_for, split_payload};
