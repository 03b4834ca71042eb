//! Engine configuration.
//!
//! All timing and capacity knobs for the reassembly core are injected
//! here; nothing inside the engine hard-codes an interval or a limit.
//!
//! # Example
//!
//! ```
//! use courier_engine::config::EngineConfig;
//! use std::time::Duration;
//!
//! // Use defaults
//! let config = EngineConfig::default();
//!
//! // Or use the builder for customization
//! let config = EngineConfig::builder()
//!     .with_sweep_interval(Duration::from_millis(500))
//!     .with_inactivity_limit(Duration::from_secs(5))
//!     .build_validated()
//!     .unwrap();
//! ```

use std::time::Duration;

use courier_protocol::limits::{DEFAULT_SEGMENT_BYTES, MAX_SEGMENT_BYTES};

/// Default sweep interval (1 second).
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default inactivity limit before an incomplete message times out
/// (3 seconds).
const DEFAULT_INACTIVITY_LIMIT: Duration = Duration::from_secs(3);

/// Default maximum number of concurrently in-flight identities.
const DEFAULT_MAX_IN_FLIGHT: usize = 100_000;

/// Default timeout for delivering one result record (10 seconds).
const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the reassembly engine.
///
/// The sweep interval must be strictly shorter than the inactivity
/// limit; this bounds worst-case timeout detection latency to
/// `inactivity_limit + sweep_interval`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How often the sweep loop scans in-flight messages.
    pub sweep_interval: Duration,

    /// How long a message may go without a new segment before it is
    /// resolved as timed out.
    pub inactivity_limit: Duration,

    /// Maximum accepted segment payload size in bytes.
    pub max_segment_bytes: usize,

    /// Maximum number of concurrently in-flight identities.
    ///
    /// A segment that would start a reassembly beyond this cap is
    /// dropped with a diagnostic.
    pub max_in_flight: usize,

    /// Per-delivery timeout for the result sink.
    pub sink_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            inactivity_limit: DEFAULT_INACTIVITY_LIMIT,
            max_segment_bytes: DEFAULT_SEGMENT_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            sink_timeout: DEFAULT_SINK_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Create a configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is zero where a positive value is
    /// required, if the sweep interval is not strictly shorter than the
    /// inactivity limit, or if the segment size exceeds
    /// [`MAX_SEGMENT_BYTES`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval".into(),
                reason: "sweep interval must be greater than zero".into(),
            });
        }

        if self.sweep_interval >= self.inactivity_limit {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval".into(),
                reason: "sweep interval must be strictly shorter than the inactivity limit".into(),
            });
        }

        if self.max_segment_bytes == 0 || self.max_segment_bytes > MAX_SEGMENT_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "max_segment_bytes".into(),
                reason: format!("segment size must be in [1, {MAX_SEGMENT_BYTES}]"),
            });
        }

        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_in_flight".into(),
                reason: "in-flight capacity must be at least 1".into(),
            });
        }

        if self.sink_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sink_timeout".into(),
                reason: "sink timeout must be greater than zero".into(),
            });
        }

        Ok(())
    }
}

/// Builder for constructing an [`EngineConfig`] with custom values.
#[derive(Clone, Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Build the final configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build_validated(self) -> Result<EngineConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the inactivity limit.
    pub fn with_inactivity_limit(mut self, limit: Duration) -> Self {
        self.config.inactivity_limit = limit;
        self
    }

    /// Set the maximum segment payload size in bytes.
    pub fn with_max_segment_bytes(mut self, bytes: usize) -> Self {
        self.config.max_segment_bytes = bytes;
        self
    }

    /// Set the in-flight identity cap.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.config.max_in_flight = max;
        self
    }

    /// Set the per-delivery sink timeout.
    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.config.sink_timeout = timeout;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// The reason it's invalid.
        reason: String,
    },
}
