//! Courier Transport Node
//!
//! Sits between the application level and the channel level of a chat
//! relay. Outbound messages are split into size-bounded segments and
//! forwarded downward; inbound segments are reassembled — in whatever
//! order they arrive — into complete messages or explicit timeout
//! failures and pushed upward.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use courier_engine::{
    spawn_sweep_loop, ConfigError, Dispatcher, EngineConfig, HttpResultSink, Ingestor, Store,
};

mod bus;
mod http;

use http::{AppState, SegmentFeed};

/// How inbound segments reach the ingestion path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum IngestMode {
    /// `/transfer` publishes frames onto the in-process bus queue; a
    /// consumer task drains it into the store.
    Bus,
    /// `/transfer` feeds the store directly.
    Direct,
}

/// Courier Transport Node
///
/// Chat relay transport: segmentation downward, reassembly upward.
#[derive(Parser, Debug)]
#[command(name = "courier-node")]
#[command(version, about, long_about = None)]
struct Args {
    /// Listen address for the HTTP adapters
    #[arg(short, long, env = "COURIER_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: String,

    /// Channel-level endpoint that accepts outbound segments
    #[arg(long, env = "COURIER_CHANNEL_URL", default_value = "http://localhost:8081/code")]
    channel_url: String,

    /// Application-level endpoint that accepts delivery reports
    #[arg(long, env = "COURIER_APP_URL", default_value = "http://localhost:3000/receive")]
    app_url: String,

    /// Segment payload size in bytes
    #[arg(long, env = "COURIER_SEGMENT_BYTES", default_value = "140")]
    segment_bytes: usize,

    /// Sweep interval in milliseconds
    #[arg(long, env = "COURIER_SWEEP_INTERVAL_MS", default_value = "1000")]
    sweep_interval_ms: u64,

    /// Inactivity limit in milliseconds before an incomplete message
    /// is reported lost
    #[arg(long, env = "COURIER_INACTIVITY_LIMIT_MS", default_value = "3000")]
    inactivity_limit_ms: u64,

    /// Maximum number of concurrently in-flight messages
    #[arg(long, env = "COURIER_MAX_IN_FLIGHT", default_value = "100000")]
    max_in_flight: usize,

    /// How inbound segments reach the store
    #[arg(long, env = "COURIER_INGEST_MODE", value_enum, default_value = "bus")]
    ingest_mode: IngestMode,

    /// Depth of the in-process bus queue (bus mode only)
    #[arg(long, env = "COURIER_BUS_QUEUE_DEPTH", default_value = "1024")]
    bus_queue_depth: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "COURIER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (plain, json)
    #[arg(long, env = "COURIER_LOG_FORMAT", default_value = "plain")]
    log_format: String,
}

fn setup_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

/// Build engine configuration from CLI arguments.
fn build_engine_config(args: &Args) -> Result<EngineConfig, ConfigError> {
    EngineConfig::builder()
        .with_sweep_interval(std::time::Duration::from_millis(args.sweep_interval_ms))
        .with_inactivity_limit(std::time::Duration::from_millis(args.inactivity_limit_ms))
        .with_max_segment_bytes(args.segment_bytes)
        .with_max_in_flight(args.max_in_flight)
        .build_validated()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, &args.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %args.listen_addr,
        channel_url = %args.channel_url,
        app_url = %args.app_url,
        ingest_mode = ?args.ingest_mode,
        "Starting courier transport node"
    );

    let config = build_engine_config(&args).context("Invalid engine configuration")?;

    // The store is constructed once; every component shares the same
    // lock through clones of this handle.
    let store = Store::new(&config);
    let ingestor = Ingestor::new(store.clone(), &config);

    let sink = HttpResultSink::new(args.app_url.clone(), config.sink_timeout)
        .context("Failed to build result sink")?;
    let dispatcher = Dispatcher::new(Arc::new(sink));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweep_loop(
        store.clone(),
        dispatcher,
        config.sweep_interval,
        shutdown_rx.clone(),
    );

    let (feed, bus_task) = match args.ingest_mode {
        IngestMode::Bus => {
            let (frame_tx, frame_rx) = mpsc::channel(args.bus_queue_depth);
            let task = bus::spawn_bus_consumer(frame_rx, ingestor.clone(), shutdown_rx.clone());
            (SegmentFeed::Queue(frame_tx), Some(task))
        }
        IngestMode::Direct => (SegmentFeed::Direct(ingestor.clone()), None),
    };

    let state = AppState::new(feed, args.channel_url.clone(), config.max_segment_bytes)?;
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "Transport node ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down courier transport node...");

    // Stop the sweep loop and bus consumer; outstanding delivery tasks
    // are attempted but not awaited.
    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    if let Some(task) = bus_task {
        let _ = task.await;
    }

    info!(in_flight = store.in_flight(), "Courier node stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_args_build_valid_config() {
        let args = Args::parse_from(["courier-node"]);
        let config = build_engine_config(&args).unwrap();

        assert_eq!(config.sweep_interval, std::time::Duration::from_secs(1));
        assert_eq!(config.inactivity_limit, std::time::Duration::from_secs(3));
        assert_eq!(config.max_segment_bytes, 140);
    }

    #[test]
    fn test_sweep_not_shorter_than_inactivity_is_rejected() {
        let args = Args::parse_from([
            "courier-node",
            "--sweep-interval-ms",
            "5000",
            "--inactivity-limit-ms",
            "3000",
        ]);
        assert!(build_engine_config(&args).is_err());
    }

    #[test]
    fn test_ingest_mode_flag() {
        let args = Args::parse_from(["courier-node", "--ingest-mode", "direct"]);
        assert_eq!(args.ingest_mode, IngestMode::Direct);
    }
}
