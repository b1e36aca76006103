//! Configuration for the agent binary.
//!
//! Loaded from environment variables (after `.env`, if present) with
//! defaults for everything. Unlike a missing variable, a malformed one is an
//! error: the agent refuses to start rather than silently using a default.

use experiment_agent_core::{MAX_QUEUE_CAPACITY, QueueConfig};
use std::env;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading [`AgentConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that does not parse.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value as found in the environment
        value: String,
        /// Parser message
        reason: String,
    },

    /// `AGENT_SDK_KEYS` was set but named no keys.
    #[error("AGENT_SDK_KEYS must name at least one SDK key")]
    NoSdkKeys,

    /// `HOST` and `PORT` do not form a socket address.
    #[error("invalid bind address {0:?}")]
    BindAddress(String),
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Prometheus exporter port; 0 disables the exporter
    pub metrics_port: u16,
    /// SDK keys served, one queueing client each. The first is the default.
    pub sdk_keys: Vec<String>,
    /// Known event keys; empty accepts any key
    pub event_keys: Vec<String>,
    /// Bounded queue size per client
    pub queue_capacity: usize,
    /// Events per dispatched batch
    pub batch_size: usize,
    /// Maximum delay before a partial batch flushes
    pub flush_interval: Duration,
    /// How long shutdown waits for the dispatchers to drain
    pub shutdown_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            metrics_port: 9090,
            sdk_keys: vec!["default".to_string()],
            event_keys: Vec::new(),
            queue_capacity: 1000,
            batch_size: 10,
            flush_interval: Duration::from_millis(30_000),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sdk_keys = match lookup("AGENT_SDK_KEYS") {
            Some(raw) => {
                let keys = split_list(&raw);
                if keys.is_empty() {
                    return Err(ConfigError::NoSdkKeys);
                }
                keys
            }
            None => defaults.sdk_keys,
        };

        let queue_capacity = parse_in_range(
            &lookup,
            "AGENT_QUEUE_CAPACITY",
            defaults.queue_capacity,
            1..=MAX_QUEUE_CAPACITY,
        )?;
        // A batch never holds more than the queue does.
        let batch_size = parse_in_range(
            &lookup,
            "AGENT_BATCH_SIZE",
            defaults.batch_size.min(queue_capacity),
            1..=queue_capacity,
        )?;

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            metrics_port: parse_var(&lookup, "METRICS_PORT", defaults.metrics_port)?,
            sdk_keys,
            event_keys: lookup("AGENT_EVENT_KEYS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            queue_capacity,
            batch_size,
            flush_interval: Duration::from_millis(parse_var(
                &lookup,
                "AGENT_FLUSH_INTERVAL_MS",
                30_000,
            )?),
            shutdown_timeout: Duration::from_secs(parse_var(&lookup, "SHUTDOWN_TIMEOUT", 30)?),
        })
    }

    /// Address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BindAddress`] if `host:port` does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::BindAddress(raw))
    }

    /// Address the Prometheus exporter binds to, if enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BindAddress`] if `host:metrics_port` does not parse.
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        if self.metrics_port == 0 {
            return Ok(None);
        }
        let raw = format!("{}:{}", self.host, self.metrics_port);
        raw.parse()
            .map(Some)
            .map_err(|_| ConfigError::BindAddress(raw))
    }

    /// Queue parameters shared by every SDK key's client.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        let config = QueueConfig {
            capacity: self.queue_capacity,
            batch_size: self.batch_size,
            flush_interval: self.flush_interval,
            event_keys: None,
        };

        if self.event_keys.is_empty() {
            config
        } else {
            config.with_event_keys(self.event_keys.iter().cloned())
        }
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_in_range<F>(
    lookup: &F,
    var: &'static str,
    default: usize,
    range: RangeInclusive<usize>,
) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_var(lookup, var, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: format!("must be between {} and {}", range.start(), range.end()),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AgentConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.metrics_addr().unwrap().map(|a| a.port()), Some(9090));
        assert_eq!(config.queue_config().event_keys, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("AGENT_SDK_KEYS", "sdk-a, sdk-b,,"),
            ("AGENT_EVENT_KEYS", "purchase,signup"),
            ("AGENT_BATCH_SIZE", "50"),
            ("AGENT_FLUSH_INTERVAL_MS", "250"),
            ("SHUTDOWN_TIMEOUT", "5"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:3000");
        assert_eq!(config.sdk_keys, vec!["sdk-a", "sdk-b"]);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));

        let queue = config.queue_config();
        let keys = queue.event_keys.expect("allow-list set");
        assert!(keys.contains("purchase"));
        assert!(keys.contains("signup"));
    }

    #[test]
    fn test_metrics_port_zero_disables_exporter() {
        let config = load(&[("METRICS_PORT", "0")]).unwrap();
        assert_eq!(config.metrics_addr().unwrap(), None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = load(&[("AGENT_QUEUE_CAPACITY", "lots")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "AGENT_QUEUE_CAPACITY", .. }
        ));
    }

    #[test]
    fn test_queue_capacity_out_of_range_is_rejected() {
        let too_big = (MAX_QUEUE_CAPACITY + 1).to_string();
        for raw in ["0", too_big.as_str()] {
            let err = load(&[("AGENT_QUEUE_CAPACITY", raw)]).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid { var: "AGENT_QUEUE_CAPACITY", .. }
            ));
        }
    }

    #[test]
    fn test_batch_size_out_of_range_is_rejected() {
        let huge = usize::MAX.to_string();
        for raw in ["0", huge.as_str()] {
            let err = load(&[("AGENT_BATCH_SIZE", raw)]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: "AGENT_BATCH_SIZE", .. }));
        }

        let err = load(&[("AGENT_QUEUE_CAPACITY", "5"), ("AGENT_BATCH_SIZE", "6")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "AGENT_BATCH_SIZE", .. }));
    }

    #[test]
    fn test_small_queue_lowers_default_batch_size() {
        let config = load(&[("AGENT_QUEUE_CAPACITY", "4")]).unwrap();
        assert_eq!(config.batch_size, 4);
    }

    #[test]
    fn test_empty_sdk_key_list_is_rejected() {
        assert_eq!(load(&[("AGENT_SDK_KEYS", " , ")]).unwrap_err(), ConfigError::NoSdkKeys);
    }

    #[test]
    fn test_bad_host_is_rejected() {
        let config = load(&[("HOST", "not a host")]).unwrap();
        assert!(matches!(config.bind_addr(), Err(ConfigError::BindAddress(_))));
    }
}
