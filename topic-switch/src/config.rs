/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Construction-time configuration of a [`TopicSwitch`][crate::TopicSwitch].

use crate::unprocessed::UnprocessedSink;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const DEFAULT_OUTBOUND_CONCURRENCY: usize = 3;
pub const DEFAULT_REPLAY_BUFFER_SIZE: usize = 1000;

/// Configuration loading and validation failures.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(json5::Error),
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "unable to read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "unable to parse config file: {err}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Serializable tuning of the switch pipelines.
///
/// ```
/// use topic_switch::SwitchConfig;
///
/// let config = SwitchConfig::from_json5("{ outbound_concurrency: 8 }").unwrap();
/// assert_eq!(config.outbound_concurrency, 8);
/// assert_eq!(config.replay_buffer_size, 1000);
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SwitchConfig {
    /// Ceiling on concurrent outbound deliveries across topics.
    #[serde(default = "default_outbound_concurrency")]
    pub outbound_concurrency: usize,
    /// Writes retained while no outbound pipeline is attached.
    #[serde(default = "default_replay_buffer_size")]
    pub replay_buffer_size: usize,
}

fn default_outbound_concurrency() -> usize {
    DEFAULT_OUTBOUND_CONCURRENCY
}

fn default_replay_buffer_size() -> usize {
    DEFAULT_REPLAY_BUFFER_SIZE
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            outbound_concurrency: DEFAULT_OUTBOUND_CONCURRENCY,
            replay_buffer_size: DEFAULT_REPLAY_BUFFER_SIZE,
        }
    }
}

impl SwitchConfig {
    pub fn from_json5(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json5(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "outbound_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.replay_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "replay_buffer_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Full switch options: pipeline tuning plus the unprocessed-event sinks.
///
/// Parse failures and unexpected inbound events go to the inbound sink; serializer
/// failures go to the outbound sink. Both default to a `tracing` warning.
#[derive(Clone, Debug, Default)]
pub struct SwitchOptions {
    pub config: SwitchConfig,
    pub inbound_sink: UnprocessedSink,
    pub outbound_sink: UnprocessedSink,
}

impl SwitchOptions {
    pub fn new(config: SwitchConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_outbound_concurrency(mut self, outbound_concurrency: usize) -> Self {
        self.config.outbound_concurrency = outbound_concurrency;
        self
    }

    pub fn with_replay_buffer_size(mut self, replay_buffer_size: usize) -> Self {
        self.config.replay_buffer_size = replay_buffer_size;
        self
    }

    pub fn with_inbound_sink(mut self, sink: UnprocessedSink) -> Self {
        self.inbound_sink = sink;
        self
    }

    pub fn with_outbound_sink(mut self, sink: UnprocessedSink) -> Self {
        self.outbound_sink = sink;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SwitchConfig, SwitchOptions};

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = SwitchConfig::from_json5("{}").unwrap();
        assert_eq!(config, SwitchConfig::default());
        assert_eq!(config.outbound_concurrency, 3);
        assert_eq!(config.replay_buffer_size, 1000);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SwitchConfig::from_json5("{ provider_concurrency: 2 }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let err = SwitchConfig::from_json5("{ outbound_concurrency: 0 }").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "outbound_concurrency",
                ..
            }
        ));
    }

    #[test]
    fn options_builder_overrides_config() {
        let options = SwitchOptions::default()
            .with_outbound_concurrency(1)
            .with_replay_buffer_size(10);
        assert_eq!(options.config.outbound_concurrency, 1);
        assert_eq!(options.config.replay_buffer_size, 10);
    }
}
