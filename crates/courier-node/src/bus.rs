//! Bus-driven ingestion adapter.
//!
//! The transport assumes an at-least-once message bus between the
//! channel level and this node: frames may arrive out of order or
//! duplicated. Connection management for the real bus client lives
//! outside this process; the adapter consumes raw JSON frames from an
//! in-process queue and feeds the same ingestion path the HTTP-push
//! adapter uses.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use courier_engine::Ingestor;
use courier_protocol::Segment;

/// Spawn the bus consumer task.
///
/// Runs until the frame queue closes or the shutdown signal flips.
pub fn spawn_bus_consumer(
    mut frames: mpsc::Receiver<Vec<u8>>,
    ingestor: Ingestor,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = frames.recv() => {
                    match frame {
                        Some(frame) => consume_frame(&ingestor, &frame),
                        None => {
                            info!("segment queue closed; bus consumer stopping");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("bus consumer stopping");
                    break;
                }
            }
        }
    })
}

/// Decode one frame and hand it to the ingestion path.
///
/// Undecodable frames are dropped with a diagnostic; the ingestion
/// path handles (and logs) everything past de-serialization.
fn consume_frame(ingestor: &Ingestor, frame: &[u8]) {
    let segment: Segment = match serde_json::from_slice(frame) {
        Ok(segment) => segment,
        Err(err) => {
            warn!(error = %err, "dropping undecodable segment frame");
            return;
        }
    };

    // Validation failures are already logged inside the path.
    let _ = ingestor.ingest(segment);
}
