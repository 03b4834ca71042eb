//! Clock-driven sweep loop.
//!
//! The loop fires on a fixed period, independent of ingestion traffic,
//! and is the only place in-flight state is ever resolved or evicted.
//! Because the interval is strictly shorter than the inactivity limit
//! (enforced by config validation), a lost message is reported within
//! `inactivity_limit + sweep_interval` of its last accepted segment.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::store::Store;

/// Spawn the periodic sweep task.
///
/// Each tick resolves the store's in-flight messages and hands every
/// outcome to the dispatcher; dispatch happens outside the store lock
/// and never blocks the next tick. The task exits promptly when the
/// shutdown signal flips or its sender is dropped.
pub fn spawn_sweep_loop(
    store: Store,
    dispatcher: Dispatcher,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcomes = store.sweep(Instant::now());
                    if !outcomes.is_empty() {
                        debug!(resolved = outcomes.len(), "sweep resolved messages");
                    }
                    for outcome in outcomes {
                        dispatcher.dispatch(outcome);
                    }
                }
                _ = shutdown.changed() => {
                    info!("sweep loop stopping");
                    break;
                }
            }
        }
    })
}
