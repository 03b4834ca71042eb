//! Fire-and-forget delivery of resolved results.
//!
//! The dispatcher turns [`MessageOutcome`]s into [`DeliveryReport`]s and
//! hands each one to the result sink in its own task, so a slow or dead
//! application level never blocks the sweep loop. Delivery is
//! best-effort: a failure is logged and the report is gone — by
//! dispatch time the message's state has already been evicted, so there
//! is nothing to retry against.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use courier_protocol::DeliveryReport;

use crate::error::SinkError;
use crate::store::MessageOutcome;

/// Destination for result records at the application level.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    /// Deliver one report.
    ///
    /// Implementations bound their own wait time; the dispatcher never
    /// imposes one on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the report could not be delivered. The
    /// dispatcher logs it and moves on.
    async fn deliver(&self, report: &DeliveryReport) -> Result<(), SinkError>;
}

/// Sink that POSTs reports as JSON to the application-level endpoint.
pub struct HttpResultSink {
    client: reqwest::Client,
    url: String,
}

impl HttpResultSink {
    /// Create a sink for the given endpoint with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn deliver(&self, report: &DeliveryReport) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(report).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Hands resolved outcomes to the sink without blocking the caller.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn ResultSink>,
}

impl Dispatcher {
    /// Create a dispatcher over the given sink.
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self { sink }
    }

    /// Format the outcome and deliver it in a spawned task.
    ///
    /// Returns immediately; delivery success or failure never reaches
    /// the caller.
    pub fn dispatch(&self, outcome: MessageOutcome) {
        let report = DeliveryReport::from(outcome);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            match sink.deliver(&report).await {
                Ok(()) => {
                    debug!(
                        sender = %report.sender,
                        error_report = report.error,
                        "result delivered"
                    );
                }
                Err(err) => {
                    warn!(
                        sender = %report.sender,
                        error = %err,
                        "result delivery failed; report dropped"
                    );
                }
            }
        });
    }
}

impl From<MessageOutcome> for DeliveryReport {
    fn from(outcome: MessageOutcome) -> Self {
        match outcome {
            MessageOutcome::Complete {
                sender,
                sent_at,
                payload,
            } => DeliveryReport::complete(sender, sent_at, payload),
            MessageOutcome::TimedOut {
                sender,
                sent_at,
                expected,
                received,
            } => DeliveryReport::timed_out(sender, sent_at, expected, received),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 21, 2, 34, 48).unwrap()
    }

    #[test]
    fn test_complete_outcome_formats_success_report() {
        let outcome = MessageOutcome::Complete {
            sender: "alice".into(),
            sent_at: ts(),
            payload: "hello".into(),
        };

        let report = DeliveryReport::from(outcome);
        assert_eq!(report.sender, "alice");
        assert_eq!(report.payload, "hello");
        assert!(!report.error);
        assert!(report.error_msg.is_none());
    }

    #[test]
    fn test_timed_out_outcome_formats_failure_report() {
        let outcome = MessageOutcome::TimedOut {
            sender: "alice".into(),
            sent_at: ts(),
            expected: 4,
            received: 2,
        };

        let report = DeliveryReport::from(outcome);
        assert!(report.error);
        assert!(report.payload.is_empty());
        let msg = report.error_msg.unwrap();
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("received 2"));
    }
}
