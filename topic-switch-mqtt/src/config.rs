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

use rumqttc::{MqttOptions, QoS};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const CLIENT_ID_PREFIX: &str = "topic-switch-";

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    256
}

/// Delivery guarantee requested for subscriptions and publishes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MqttQos {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl From<MqttQos> for QoS {
    fn from(qos: MqttQos) -> Self {
        match qos {
            MqttQos::AtMostOnce => QoS::AtMostOnce,
            MqttQos::AtLeastOnce => QoS::AtLeastOnce,
            MqttQos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// Broker connection settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MqttConnectorConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Generated once per connector when absent.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub qos: MqttQos,
    /// Bound of both the client request queue and the inbound event queue.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for MqttConnectorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            username: None,
            password: None,
            qos: MqttQos::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl MqttConnectorConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Configured client id, or a fresh random one.
    pub(crate) fn resolve_client_id(&self) -> String {
        match &self.client_id {
            Some(client_id) => client_id.clone(),
            None => format!("{CLIENT_ID_PREFIX}{}", Uuid::new_v4().simple()),
        }
    }

    pub(crate) fn mqtt_options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(5)));
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            options.set_credentials(
                username.clone(),
                self.password.clone().unwrap_or_default(),
            );
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::{MqttConnectorConfig, MqttQos, CLIENT_ID_PREFIX};

    #[test]
    fn defaults_fill_missing_fields() {
        let config: MqttConnectorConfig = json5::from_str("{ host: 'broker.local' }").unwrap();

        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 1883);
        assert_eq!(config.qos, MqttQos::AtLeastOnce);
        assert_eq!(config.client_id, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = json5::from_str::<MqttConnectorConfig>("{ hostname: 'broker.local' }");
        assert!(parsed.is_err());
    }

    #[test]
    fn qos_uses_snake_case_names() {
        let config: MqttConnectorConfig = json5::from_str("{ qos: 'exactly_once' }").unwrap();
        assert_eq!(config.qos, MqttQos::ExactlyOnce);
    }

    #[test]
    fn client_id_is_generated_when_absent() {
        let config = MqttConnectorConfig::default();
        let first = config.resolve_client_id();

        assert!(first.starts_with(CLIENT_ID_PREFIX));
        assert_ne!(first, config.resolve_client_id());
        assert_eq!(
            config.with_client_id("fixed").resolve_client_id(),
            "fixed"
        );
    }
}
