//! # courier-engine
//!
//! The reassembly core of the Courier transport layer.
//!
//! This crate provides:
//! - **Store**: concurrent map from message identity to in-flight
//!   reassembly state, behind one long-lived exclusive lock
//! - **Ingestor**: validation in front of the store
//! - **Sweep loop**: clock-driven task resolving in-flight messages to
//!   complete results or explicit timeouts
//! - **Dispatcher**: fire-and-forget delivery of resolved results
//!
//! ## Failure Semantics
//!
//! Only two outcomes are ever visible outside this crate: a complete
//! message or a timeout failure. Malformed segments, duplicates, and
//! metadata conflicts are dropped internally with a diagnostic.
//! Downstream delivery failures are logged and never retried; by the
//! time a result is dispatched its state has already been evicted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod store;
pub mod sweep;

pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use dispatch::{Dispatcher, HttpResultSink, ResultSink};
pub use error::{EngineError, Result, SinkError};
pub use ingest::Ingestor;
pub use store::{EngineStats, IngestOutcome, MessageOutcome, Store};
pub use sweep::spawn_sweep_loop;
