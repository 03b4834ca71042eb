//! Protocol limits and defaults.
//!
//! All wire-level limits are defined here for consistent enforcement.

/// Default segment payload size in bytes.
pub const DEFAULT_SEGMENT_BYTES: usize = 140;

/// Hard upper bound on a single segment payload in bytes.
///
/// Segments above this are dropped at ingestion regardless of the
/// configured segment size; the bound caps per-identity buffer growth.
pub const MAX_SEGMENT_BYTES: usize = 4096;
