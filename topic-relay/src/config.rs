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

use serde::Deserialize;
use std::path::Path;
use topic_switch::{ConfigError, SwitchConfig};
use topic_switch_mqtt::MqttConnectorConfig;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub(crate) switch: SwitchConfig,
    pub(crate) broker: MqttConnectorConfig,
    pub(crate) relays: Vec<RelayRule>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RelayRule {
    pub(crate) from: String,
    pub(crate) to: String,
}

impl RelayConfig {
    pub(crate) fn from_json5(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json5(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.switch.validate()?;
        if self.relays.is_empty() {
            return Err(ConfigError::Invalid {
                field: "relays",
                reason: "at least one relay is required".to_string(),
            });
        }
        if let Some(rule) = self.relays.iter().find(|rule| rule.from == rule.to) {
            return Err(ConfigError::Invalid {
                field: "relays",
                reason: format!("{} would be relayed onto itself", rule.from),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{RelayConfig, RelayRule};
    use topic_switch::ConfigError;

    #[test]
    fn sample_config_parses() {
        let config =
            RelayConfig::from_json5(include_str!("../config/relay.json5")).unwrap();

        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.switch.outbound_concurrency, 3);
        assert_eq!(
            config.relays[1],
            RelayRule {
                from: "zigbee2mqtt/plug/state".to_string(),
                to: "home/plug/state".to_string(),
            }
        );
    }

    #[test]
    fn switch_section_is_optional() {
        let config = RelayConfig::from_json5(
            "{ broker: { host: 'b' }, relays: [{ from: 'a', to: 'c' }] }",
        )
        .unwrap();
        assert_eq!(config.switch.replay_buffer_size, 1000);
    }

    #[test]
    fn self_relays_are_rejected() {
        let parsed = RelayConfig::from_json5("{ broker: {}, relays: [{ from: 'a', to: 'a' }] }");
        assert!(matches!(parsed, Err(ConfigError::Invalid { field: "relays", .. })));
    }
}
