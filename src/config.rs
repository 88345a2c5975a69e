//! Startup configuration, loaded once and passed by value into the service.
//!
//! All knobs are plain scalars. Environment loading goes through `dotenvy`
//! so a local `.env` file works the same as real environment variables.

use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("batch size must be a positive integer")]
    InvalidBatchSize,
    #[error("aggregation interval must be a positive number of milliseconds")]
    InvalidInterval,
    #[error("invalid value for {var}: {source}")]
    Env {
        var: &'static str,
        source: ParseIntError,
    },
}

/// Connection parameters for the external broker client.
///
/// The broker client itself lives outside this crate; these values are only
/// carried so the embedding process has one place to load them from.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub client_id: String,
    pub brokers: Vec<String>,
    pub connection_timeout: Duration,
    pub group_id: String,
    pub input_topic: String,
    pub output_topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            client_id: "streamsum-consumer".to_string(),
            brokers: vec!["localhost:9092".to_string()],
            connection_timeout: Duration::from_secs(10),
            group_id: "events-aggregator-group".to_string(),
            input_topic: "events-topic".to_string(),
            output_topic: "events-summary-table".to_string(),
        }
    }
}

impl BrokerConfig {
    /// Load from the environment, falling back to defaults per field.
    ///
    /// Recognized variables: `KAFKA_BROKER`, `INPUT_TOPIC`, `OUTPUT_TOPIC`,
    /// `CONSUMER_GROUP`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("KAFKA_BROKER") {
            config.brokers = raw.split(',').map(str::to_string).collect();
        }
        if let Ok(topic) = std::env::var("INPUT_TOPIC") {
            config.input_topic = topic;
        }
        if let Ok(topic) = std::env::var("OUTPUT_TOPIC") {
            config.output_topic = topic;
        }
        if let Ok(group) = std::env::var("CONSUMER_GROUP") {
            config.group_id = group;
        }
        config
    }
}

/// The two numeric triggers consumed by the window controller.
#[derive(Clone, Copy, Debug)]
pub struct AggregationConfig {
    /// Close the window once this many events are buffered.
    pub batch_size: u64,
    /// Close a non-empty window once this much wall-clock time has passed.
    pub interval: Duration,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            interval: Duration::from_millis(30_000),
        }
    }
}

impl AggregationConfig {
    pub fn new(batch_size: u64, interval: Duration) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(Self {
            batch_size,
            interval,
        })
    }

    /// Load from `BATCH_SIZE` / `INTERVAL_MS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let batch_size = match std::env::var("BATCH_SIZE") {
            Ok(raw) => raw.parse().map_err(|source| ConfigError::Env {
                var: "BATCH_SIZE",
                source,
            })?,
            Err(_) => defaults.batch_size,
        };
        let interval_ms: u64 = match std::env::var("INTERVAL_MS") {
            Ok(raw) => raw.parse().map_err(|source| ConfigError::Env {
                var: "INTERVAL_MS",
                source,
            })?,
            Err(_) => defaults.interval.as_millis() as u64,
        };
        Self::new(batch_size, Duration::from_millis(interval_ms))
    }
}

/// Sizing for the fan-out hub.
#[derive(Clone, Copy, Debug)]
pub struct HubConfig {
    /// Per-subscriber buffer depth before drop-oldest kicks in.
    pub buffer_capacity: usize,
    /// Hard cap on concurrently registered subscribers.
    pub max_subscribers: usize,
}

impl HubConfig {
    pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;
    pub const DEFAULT_MAX_SUBSCRIBERS: usize = 10_000;

    #[must_use]
    pub fn new(buffer_capacity: usize, max_subscribers: usize) -> Self {
        Self {
            buffer_capacity: if buffer_capacity == 0 {
                Self::DEFAULT_BUFFER_CAPACITY
            } else {
                buffer_capacity
            },
            max_subscribers: if max_subscribers == 0 {
                Self::DEFAULT_MAX_SUBSCRIBERS
            } else {
                max_subscribers
            },
        }
    }

    #[must_use]
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_max_subscribers(mut self, max_subscribers: usize) -> Self {
        self.max_subscribers = max_subscribers.max(1);
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUFFER_CAPACITY, Self::DEFAULT_MAX_SUBSCRIBERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_triggers_are_rejected() {
        assert!(matches!(
            AggregationConfig::new(0, Duration::from_secs(1)),
            Err(ConfigError::InvalidBatchSize)
        ));
        assert!(matches!(
            AggregationConfig::new(1, Duration::ZERO),
            Err(ConfigError::InvalidInterval)
        ));
    }

    #[test]
    fn hub_config_clamps_zero_to_defaults() {
        let config = HubConfig::new(0, 0);
        assert_eq!(config.buffer_capacity, HubConfig::DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.max_subscribers, HubConfig::DEFAULT_MAX_SUBSCRIBERS);
    }
}
