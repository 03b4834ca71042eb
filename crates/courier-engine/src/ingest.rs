//! Ingestion path: validation in front of the store.
//!
//! Every adapter feeds segments through one [`Ingestor`]; the bus-driven
//! and HTTP-push variants differ only in how bytes reach it. Envelope
//! de-serialization happens upstream in the adapters.

use courier_protocol::{ProtocolError, Segment};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::store::{IngestOutcome, Store};

/// Validates inbound segments and inserts them into the store.
///
/// Segments failing validation are dropped with a diagnostic and never
/// reach the store. Conflicts, duplicates, and capacity drops are
/// logged here and surfaced to the adapter as an [`IngestOutcome`];
/// none of them produce output downstream.
#[derive(Clone, Debug)]
pub struct Ingestor {
    store: Store,
    max_segment_bytes: usize,
}

impl Ingestor {
    /// Create an ingestion path in front of the given store.
    pub fn new(store: Store, config: &EngineConfig) -> Self {
        Self {
            store,
            max_segment_bytes: config.max_segment_bytes,
        }
    }

    /// Validate one segment and offer it to the store.
    ///
    /// # Errors
    ///
    /// Returns the validation error for a malformed segment. The
    /// segment is dropped; nothing was mutated.
    pub fn ingest(&self, segment: Segment) -> Result<IngestOutcome, ProtocolError> {
        if let Err(err) = segment.validate() {
            warn!(error = %err, "dropping malformed segment");
            return Err(err);
        }

        let size = segment.payload().len();
        if size > self.max_segment_bytes {
            let err = ProtocolError::SegmentTooLarge {
                max: self.max_segment_bytes,
                actual: size,
            };
            warn!(sender = %segment.sender(), error = %err, "dropping oversized segment");
            return Err(err);
        }

        let outcome = self.store.ingest(&segment);
        match outcome {
            IngestOutcome::Accepted { received, expected } => {
                debug!(
                    sender = %segment.sender(),
                    ordinal = segment.ordinal(),
                    received,
                    expected,
                    "segment accepted"
                );
            }
            IngestOutcome::Duplicate => {
                debug!(
                    sender = %segment.sender(),
                    ordinal = segment.ordinal(),
                    "ignoring duplicate segment"
                );
            }
            IngestOutcome::MetadataConflict => {
                warn!(
                    sender = %segment.sender(),
                    ordinal = segment.ordinal(),
                    total = segment.total(),
                    "segment metadata conflicts with in-flight state; dropped"
                );
            }
            IngestOutcome::AtCapacity => {
                warn!(
                    sender = %segment.sender(),
                    "reassembly store at capacity; segment dropped"
                );
            }
        }
        Ok(outcome)
    }
}
