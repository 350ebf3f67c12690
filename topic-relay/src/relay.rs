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

use crate::config::RelayRule;
use futures::StreamExt;
use tokio::task::JoinHandle;
use topic_switch::{codec, Connector, SwitchError, TopicSwitch};
use tracing::info;

/// Wires one task per rule that republishes every decoded source value on the target.
///
/// The source is a hot topic, so the current value is forwarded as soon as it exists.
pub(crate) fn spawn_relays<C: Connector>(
    switch: &TopicSwitch<C>,
    rules: &[RelayRule],
) -> Result<Vec<JoinHandle<()>>, SwitchError> {
    rules
        .iter()
        .map(|rule| {
            let source = switch.create_optional_hot_topic_consumer(&rule.from, codec::text())?;
            let target = switch.create_topic_producer(&rule.to, codec::display::<String>())?;
            info!(from = rule.from.as_str(), to = rule.to.as_str(), "relay configured");

            Ok(tokio::spawn(async move {
                let values = source.changes().filter_map(|value| async move { value });
                target.forward(values).await;
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::spawn_relays;
    use crate::config::RelayRule;
    use topic_switch::{InMemoryConnector, SwitchOptions, TopicSwitch};

    #[tokio::test]
    async fn source_values_are_republished() {
        let connector = InMemoryConnector::new();
        let switch =
            TopicSwitch::new("relay-test", connector.clone(), SwitchOptions::default()).unwrap();
        let rules = vec![RelayRule {
            from: "plug/state".to_string(),
            to: "home/plug".to_string(),
        }];

        let relays = spawn_relays(&switch, &rules).unwrap();
        switch.start().await.unwrap();
        connector.event("plug/state", "ON").unwrap();
        connector.wait_for_consumed_events(1).await;

        let delivered = connector.consumed_events();
        assert_eq!(delivered[0].topic.as_str(), "home/plug");
        assert_eq!(delivered[0].value, "ON");

        relays.iter().for_each(|relay| relay.abort());
        switch.stop().await.unwrap();
    }
}
