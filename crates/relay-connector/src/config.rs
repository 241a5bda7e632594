// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector configuration.
//!
//! Supports programmatic, file-based (TOML) and environment configuration.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RELAY_CONFIG_FILE` | TOML file loaded first |
//! | `RELAY_RESPONSE_TIMEOUT_MS` | `response_timeout_ms` |
//! | `RELAY_MAX_PENDING_RESPONSES` | `max_pending_responses` |
//! | `RELAY_EVENT_QUEUE_CAPACITY` | `event_queue_capacity` |
//! | `RELAY_ACTIVITY_POLICY` | `activity_policy` (`on_change`, `always`, `until_acknowledged`) |
//!
//! Unparsable values are logged and ignored.

use crate::activity::ActivityResendPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_CONFIG_FILE: &str = "RELAY_CONFIG_FILE";
pub const ENV_RESPONSE_TIMEOUT_MS: &str = "RELAY_RESPONSE_TIMEOUT_MS";
pub const ENV_MAX_PENDING_RESPONSES: &str = "RELAY_MAX_PENDING_RESPONSES";
pub const ENV_EVENT_QUEUE_CAPACITY: &str = "RELAY_EVENT_QUEUE_CAPACITY";
pub const ENV_ACTIVITY_POLICY: &str = "RELAY_ACTIVITY_POLICY";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Time a listener has to answer a request (milliseconds).
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Status of the reply sent when a response times out.
    #[serde(default = "default_timeout_status")]
    pub timeout_status: u16,

    /// Status of the reply sent when no listener owns the request path.
    #[serde(default = "default_not_found_status")]
    pub not_found_status: u16,

    /// Status of the reply sent when too many responses are pending.
    #[serde(default = "default_overloaded_status")]
    pub overloaded_status: u16,

    /// Maximum number of unresolved responses.
    #[serde(default = "default_max_pending_responses")]
    pub max_pending_responses: usize,

    /// Capacity of the transport event queue.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// When activity state changes are reported.
    #[serde(default)]
    pub activity_policy: ActivityResendPolicy,

    /// Name of the event worker thread (the timer uses `<name>-timer`).
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
}

fn default_response_timeout_ms() -> u64 {
    10_000
}

fn default_timeout_status() -> u16 {
    504
}

fn default_not_found_status() -> u16 {
    404
}

fn default_overloaded_status() -> u16 {
    503
}

fn default_max_pending_responses() -> usize {
    4096
}

fn default_event_queue_capacity() -> usize {
    1024
}

fn default_worker_thread_name() -> String {
    "relay-worker".to_string()
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout_ms(),
            timeout_status: default_timeout_status(),
            not_found_status: default_not_found_status(),
            overloaded_status: default_overloaded_status(),
            max_pending_responses: default_max_pending_responses(),
            event_queue_capacity: default_event_queue_capacity(),
            activity_policy: ActivityResendPolicy::default(),
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

impl ConnectorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from `RELAY_*` environment variables.
    ///
    /// `RELAY_CONFIG_FILE`, if set, is loaded first; the other variables
    /// override its values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(ENV_CONFIG_FILE).ok().filter(|s| !s.is_empty()) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (see module docs).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, ENV_RESPONSE_TIMEOUT_MS) {
            self.response_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_PENDING_RESPONSES) {
            self.max_pending_responses = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_EVENT_QUEUE_CAPACITY) {
            self.event_queue_capacity = v;
        }
        if let Some(raw) = lookup(ENV_ACTIVITY_POLICY).filter(|s| !s.is_empty()) {
            match parse_policy(&raw) {
                Some(policy) => self.activity_policy = policy,
                None => log::warn!(
                    "[relay] ignoring {}={:?}: expected on_change, always or until_acknowledged",
                    ENV_ACTIVITY_POLICY,
                    raw
                ),
            }
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_pending_responses(mut self, max: usize) -> Self {
        self.max_pending_responses = max;
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn with_activity_policy(mut self, policy: ActivityResendPolicy) -> Self {
        self.activity_policy = policy;
        self
    }

    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }

    /// Response deadline as a [`Duration`].
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "response_timeout_ms must be greater than 0".into(),
            ));
        }

        for (name, status) in [
            ("timeout_status", self.timeout_status),
            ("not_found_status", self.not_found_status),
            ("overloaded_status", self.overloaded_status),
        ] {
            if !(100..=599).contains(&status) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be an HTTP status code, got {}",
                    name, status
                )));
            }
        }

        if self.max_pending_responses == 0 {
            return Err(ConfigError::Invalid(
                "max_pending_responses must be greater than 0".into(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_queue_capacity must be greater than 0".into(),
            ));
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "worker_thread_name must not be empty".into(),
            ));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(name).filter(|s| !s.is_empty())?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[relay] ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

fn parse_policy(raw: &str) -> Option<ActivityResendPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on_change" | "onchange" => Some(ActivityResendPolicy::OnChange),
        "always" => Some(ActivityResendPolicy::Always),
        "until_acknowledged" | "untilacknowledged" => {
            Some(ActivityResendPolicy::UntilAcknowledged)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ConnectorConfig::default();
        assert_eq!(config.response_timeout(), Duration::from_secs(10));
        assert_eq!(config.timeout_status, 504);
        assert_eq!(config.not_found_status, 404);
        assert_eq!(config.activity_policy, ActivityResendPolicy::OnChange);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            response_timeout_ms = 2500
            activity_policy = "until_acknowledged"
        "#;

        let config: ConnectorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.response_timeout_ms, 2500);
        assert_eq!(config.activity_policy, ActivityResendPolicy::UntilAcknowledged);
        assert_eq!(config.max_pending_responses, 4096);
        assert_eq!(config.worker_thread_name, "relay-worker");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_pending_responses = 8").unwrap();
        writeln!(file, "worker_thread_name = \"edge-relay\"").unwrap();

        let config = ConnectorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_pending_responses, 8);
        assert_eq!(config.worker_thread_name, "edge-relay");
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "response_timeout_ms = 0").unwrap();

        let err = ConnectorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ConnectorConfig::from_file("/nonexistent/relay.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_RESPONSE_TIMEOUT_MS, "750"),
            (ENV_MAX_PENDING_RESPONSES, "not-a-number"),
            (ENV_ACTIVITY_POLICY, "always"),
        ]
        .into_iter()
        .collect();

        let mut config = ConnectorConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.response_timeout_ms, 750);
        assert_eq!(config.max_pending_responses, 4096);
        assert_eq!(config.activity_policy, ActivityResendPolicy::Always);
    }

    #[test]
    fn test_validate() {
        let config = ConnectorConfig {
            timeout_status: 42,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectorConfig::default().with_max_pending_responses(0);
        assert!(config.validate().is_err());

        let config = ConnectorConfig::default().with_worker_thread_name("  ");
        assert!(config.validate().is_err());

        let config = ConnectorConfig::default()
            .with_response_timeout(Duration::from_millis(50))
            .with_activity_policy(ActivityResendPolicy::UntilAcknowledged);
        assert!(config.validate().is_ok());
        assert_eq!(config.response_timeout_ms, 50);
    }
}
