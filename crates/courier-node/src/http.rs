//! HTTP adapters: the application-level send path and the
//! channel-level push endpoint.
//!
//! `/send` takes a whole message from the application level, splits it,
//! and forwards every segment to the channel level concurrently.
//! `/transfer` is the inbound push adapter: the channel level POSTs one
//! segment at a time, and depending on the ingest mode the segment goes
//! straight into the ingestion path or onto the bus queue.

use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use courier_engine::Ingestor;
use courier_protocol::{segments_for, Segment};

/// Timeout for forwarding one segment to the channel level.
const CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Where accepted segments go on their way to the store.
#[derive(Clone)]
pub enum SegmentFeed {
    /// Feed segments straight into the ingestion path.
    Direct(Ingestor),
    /// Publish raw segment frames onto the in-process bus queue.
    Queue(mpsc::Sender<Vec<u8>>),
}

/// Shared state for the HTTP adapters.
#[derive(Clone)]
pub struct AppState {
    feed: SegmentFeed,
    http: reqwest::Client,
    channel_url: String,
    segment_bytes: usize,
}

impl AppState {
    /// Build adapter state with its outbound HTTP client.
    pub fn new(feed: SegmentFeed, channel_url: String, segment_bytes: usize) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(CHANNEL_TIMEOUT)
            .build()
            .context("failed to build channel-level HTTP client")?;

        Ok(Self {
            feed,
            http,
            channel_url,
            segment_bytes,
        })
    }
}

/// Build the transport's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/send", post(handle_send))
        .route("/transfer", post(handle_transfer))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Message handed down from the application level.
#[derive(Debug, Deserialize)]
struct SendRequest {
    sender: String,
    send_time: DateTime<Utc>,
    #[serde(rename = "data")]
    payload: String,
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Split an outbound message and forward its segments to the channel
/// level.
async fn handle_send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> impl IntoResponse {
    if request.sender.is_empty()
        || request.payload.is_empty()
        || request.send_time == DateTime::<Utc>::UNIX_EPOCH
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "sender, data and send_time are required"})),
        );
    }

    let segments = match segments_for(
        &request.sender,
        request.send_time,
        &request.payload,
        state.segment_bytes,
    ) {
        Ok(segments) => segments,
        Err(err) => {
            warn!(sender = %request.sender, error = %err, "rejecting send request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            );
        }
    };
    let total = segments.len();

    // All segments go out concurrently; the channel level reorders
    // freely anyway.
    let mut tasks = Vec::with_capacity(total);
    for segment in segments {
        let client = state.http.clone();
        let url = state.channel_url.clone();
        tasks.push(tokio::spawn(async move {
            forward_segment(&client, &url, &segment).await
        }));
    }

    let mut failures = Vec::new();
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push(format!("{err:#}")),
            Err(err) => failures.push(err.to_string()),
        }
    }

    if failures.is_empty() {
        info!(sender = %request.sender, segments = total, "message forwarded to channel level");
        (StatusCode::OK, Json(json!({"segments": total})))
    } else {
        warn!(
            sender = %request.sender,
            failed = failures.len(),
            total,
            "segment forwarding failed"
        );
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": failures.join("; ")})),
        )
    }
}

async fn forward_segment(
    client: &reqwest::Client,
    url: &str,
    segment: &Segment,
) -> anyhow::Result<()> {
    let response = client
        .post(url)
        .json(segment)
        .send()
        .await
        .with_context(|| format!("segment {} not sent", segment.ordinal()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("segment {} rejected with status {status}: {body}", segment.ordinal());
    }
    Ok(())
}

/// Accept one segment pushed by the channel level.
async fn handle_transfer(
    State(state): State<AppState>,
    Json(segment): Json<Segment>,
) -> impl IntoResponse {
    // Reject malformed segments at the door in both modes; the bus
    // consumer would only drop them silently later.
    if let Err(err) = segment.validate() {
        warn!(error = %err, "rejecting transfer request");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": err.to_string()})),
        );
    }

    match &state.feed {
        SegmentFeed::Direct(ingestor) => match ingestor.ingest(segment) {
            Ok(_) => (StatusCode::OK, Json(json!({"status": "segment accepted"}))),
            Err(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            ),
        },
        SegmentFeed::Queue(queue) => {
            let frame = match serde_json::to_vec(&segment) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "failed to encode segment frame");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "segment encoding failed"})),
                    );
                }
            };

            if queue.send(frame).await.is_err() {
                warn!("segment queue closed; segment dropped");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"error": "ingestion unavailable"})),
                );
            }
            (StatusCode::OK, Json(json!({"status": "segment accepted"})))
        }
    }
}
