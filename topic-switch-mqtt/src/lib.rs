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

//! # topic-switch-mqtt
//!
//! [`MqttConnector`] drives one MQTT broker connection for a
//! [`TopicSwitch`][topic_switch::TopicSwitch], on top of `rumqttc`.
//!
//! ```no_run
//! use topic_switch::{codec, SwitchOptions, TopicSwitch};
//! use topic_switch_mqtt::{MqttConnector, MqttConnectorConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let connector = MqttConnector::new(MqttConnectorConfig::new("localhost", 1883));
//! let switch = TopicSwitch::new("mqtt", connector, SwitchOptions::default()).unwrap();
//! let power = switch
//!     .create_hot_topic_consumer("plug/power", codec::from_str::<f64>(), 0.0)
//!     .unwrap();
//!
//! switch.start().await.unwrap();
//! println!("power: {}", power.value());
//! switch.stop().await.unwrap();
//! # });
//! ```

mod config;

pub use config::{MqttConnectorConfig, MqttQos};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, Incoming, Outgoing, Publish, QoS,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use topic_switch::{
    Connector, ConnectorError, ConnectorErrorKind, DeliverFn, RawEvent, RawEventStream,
    TopicName,
};
use tracing::{debug, info, warn};

const COMPONENT: &str = "mqtt_connector";

/// Structured event names logged by the connector.
pub mod events {
    pub const CONNECT_OK: &str = "mqtt_connect_ok";
    pub const SESSION_ESTABLISHED: &str = "mqtt_session_established";
    pub const BROKER_DISCONNECTED: &str = "mqtt_broker_disconnected";
    pub const CONNECTION_ERROR: &str = "mqtt_connection_error";
    pub const DISCONNECT_SENT: &str = "mqtt_disconnect_sent";
    pub const DISCONNECT_OK: &str = "mqtt_disconnect_ok";
    pub const INBOUND_DROPPED: &str = "mqtt_inbound_dropped";
    pub const PUBLISH_DROPPED: &str = "mqtt_publish_dropped";
    pub const RESUBSCRIBE: &str = "mqtt_resubscribe";
    pub const RESUBSCRIBE_FAILED: &str = "mqtt_resubscribe_failed";
}

const EVENT_LOOP_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Topics subscribed through a connection. The broker forgets them on every clean
/// reconnect, so the event loop issues them again.
#[derive(Clone, Debug, Default)]
struct LiveTopics(Arc<Mutex<BTreeSet<TopicName>>>);

impl LiveTopics {
    fn insert(&self, topic: &TopicName) {
        lock(&self.0).insert(topic.clone());
    }

    fn remove(&self, topic: &TopicName) {
        lock(&self.0).remove(topic);
    }

    fn snapshot(&self) -> Vec<TopicName> {
        lock(&self.0).iter().cloned().collect()
    }
}

/// What the event loop needs to restore subscriptions after a reconnect.
struct Resubscriber {
    client: AsyncClient,
    qos: QoS,
    topics: LiveTopics,
}

impl Resubscriber {
    /// Queues a SUBSCRIBE per live topic without waiting on the request channel,
    /// which only drains while the event loop polls. Returns the number queued.
    fn resubscribe(&self, client_id: &str) -> usize {
        let mut queued = 0;
        for topic in self.topics.snapshot() {
            match self.client.try_subscribe(topic.as_str(), self.qos) {
                Ok(()) => {
                    queued += 1;
                    info!(
                        event = events::RESUBSCRIBE,
                        component = COMPONENT,
                        client_id,
                        topic = topic.as_str(),
                        "subscription restored after reconnect"
                    );
                }
                Err(err) => warn!(
                    event = events::RESUBSCRIBE_FAILED,
                    component = COMPONENT,
                    client_id,
                    topic = topic.as_str(),
                    err = %err,
                    "unable to restore subscription after reconnect"
                ),
            }
        }
        queued
    }
}

/// Live broker session returned by [`MqttConnector::open`].
pub struct MqttConnection {
    client_id: String,
    client: AsyncClient,
    qos: QoS,
    topics: LiveTopics,
    inbound: Mutex<Option<mpsc::Receiver<RawEvent>>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
}

impl MqttConnection {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Topics this connection keeps subscribed across reconnects.
    pub fn subscribed_topics(&self) -> Vec<TopicName> {
        self.topics.snapshot()
    }
}

///
/// [`MqttConnector`] is the broker [`Connector`].
///
/// `open()` returns once the broker accepted the session. Afterwards a background
/// task polls the `rumqttc` event loop: it forwards PUBLISH packets to the inbound
/// stream and lets the client reconnect after a network failure. The session is
/// opened clean, so every live subscription is issued again once the broker
/// acknowledges a reconnect.
#[derive(Clone, Debug)]
pub struct MqttConnector {
    config: MqttConnectorConfig,
}

impl MqttConnector {
    pub fn new(config: MqttConnectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttConnectorConfig {
        &self.config
    }

    async fn await_connack(event_loop: &mut EventLoop) -> Result<(), ConnectorError> {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    return match ack.code {
                        ConnectReturnCode::Success => Ok(()),
                        refused => Err(ConnectorError::new(
                            ConnectorErrorKind::Open,
                            format!("broker refused connection: {refused:?}"),
                        )),
                    };
                }
                Ok(_) => continue,
                Err(err) => {
                    return Err(ConnectorError::with_source(
                        ConnectorErrorKind::Open,
                        "unable to reach broker",
                        err,
                    ))
                }
            }
        }
    }

    /// Polls until the connection is closed on purpose. Inbound publishes are
    /// forwarded in arrival order; a full inbound queue holds the loop back.
    async fn event_loop(
        client_id: String,
        mut event_loop: EventLoop,
        inbound: mpsc::Sender<RawEvent>,
        resubscriber: Resubscriber,
        closed: Arc<AtomicBool>,
        reconnect_delay: Duration,
    ) {
        let client_id = client_id.as_str();
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    if let Some(event) = Self::raw_event(client_id, publish) {
                        if inbound.send(event).await.is_err() {
                            debug!(
                                event = events::INBOUND_DROPPED,
                                component = COMPONENT,
                                client_id,
                                "inbound reader is gone; dropping publish"
                            );
                        }
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    info!(
                        event = events::SESSION_ESTABLISHED,
                        component = COMPONENT,
                        client_id,
                        code = ?ack.code,
                        "broker session re-established"
                    );
                    if ack.code == ConnectReturnCode::Success {
                        resubscriber.resubscribe(client_id);
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    info!(
                        event = events::BROKER_DISCONNECTED,
                        component = COMPONENT,
                        client_id,
                        "broker disconnected"
                    )
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!(
                        event = events::DISCONNECT_SENT,
                        component = COMPONENT,
                        client_id,
                        "disconnect sent"
                    );
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    if closed.load(Ordering::SeqCst) {
                        return;
                    }
                    warn!(
                        event = events::CONNECTION_ERROR,
                        component = COMPONENT,
                        client_id,
                        err = %err,
                        retry_in_ms = reconnect_delay.as_millis() as u64,
                        "broker connection error; reconnecting"
                    );
                    tokio::time::sleep(reconnect_delay).await;
                }
            }
        }
    }

    fn raw_event(client_id: &str, publish: Publish) -> Option<RawEvent> {
        let topic = match TopicName::new(&publish.topic) {
            Ok(topic) => topic,
            Err(err) => {
                warn!(
                    event = events::PUBLISH_DROPPED,
                    component = COMPONENT,
                    client_id,
                    topic = publish.topic.as_str(),
                    err = %err,
                    "dropping publish with unusable topic"
                );
                return None;
            }
        };
        match String::from_utf8(publish.payload.to_vec()) {
            Ok(value) => Some(RawEvent::new(topic, value)),
            Err(err) => {
                warn!(
                    event = events::PUBLISH_DROPPED,
                    component = COMPONENT,
                    client_id,
                    topic = topic.as_str(),
                    err = %err,
                    "dropping non UTF-8 payload"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Connector for MqttConnector {
    type Connection = MqttConnection;

    async fn open(&self) -> Result<MqttConnection, ConnectorError> {
        let client_id = self.config.resolve_client_id();
        let capacity = self.config.channel_capacity.max(1);
        let (client, mut event_loop) =
            AsyncClient::new(self.config.mqtt_options(&client_id), capacity);

        match tokio::time::timeout(
            self.config.connect_timeout(),
            Self::await_connack(&mut event_loop),
        )
        .await
        {
            Ok(connected) => connected?,
            Err(_) => {
                return Err(ConnectorError::new(
                    ConnectorErrorKind::Open,
                    format!(
                        "no answer from {}:{} within {:?}",
                        self.config.host,
                        self.config.port,
                        self.config.connect_timeout()
                    ),
                ))
            }
        }
        info!(
            event = events::CONNECT_OK,
            component = COMPONENT,
            client_id = client_id.as_str(),
            host = self.config.host.as_str(),
            port = self.config.port,
            "connected to broker"
        );

        let (sender, receiver) = mpsc::channel(capacity);
        let closed = Arc::new(AtomicBool::new(false));
        let qos: QoS = self.config.qos.into();
        let topics = LiveTopics::default();
        let resubscriber = Resubscriber {
            client: client.clone(),
            qos,
            topics: topics.clone(),
        };
        let task = tokio::spawn(Self::event_loop(
            client_id.clone(),
            event_loop,
            sender,
            resubscriber,
            closed.clone(),
            self.config.reconnect_delay(),
        ));

        Ok(MqttConnection {
            client_id,
            client,
            qos,
            topics,
            inbound: Mutex::new(Some(receiver)),
            event_loop: Mutex::new(Some(task)),
            closed,
        })
    }

    async fn close(&self, connection: &MqttConnection) -> Result<(), ConnectorError> {
        if connection.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let disconnected = connection.client.disconnect().await;

        let task = lock(&connection.event_loop).take();
        if let Some(mut task) = task {
            if tokio::time::timeout(EVENT_LOOP_SHUTDOWN_GRACE, &mut task)
                .await
                .is_err()
            {
                task.abort();
            }
        }
        info!(
            event = events::DISCONNECT_OK,
            component = COMPONENT,
            client_id = connection.client_id.as_str(),
            "disconnected from broker"
        );

        disconnected.map_err(|err| {
            ConnectorError::with_source(ConnectorErrorKind::Close, "disconnect failed", err)
        })
    }

    async fn build_deliver_fn(
        &self,
        connection: &MqttConnection,
    ) -> Result<DeliverFn, ConnectorError> {
        let client = connection.client.clone();
        let qos = connection.qos;
        Ok(Arc::new(move |event: RawEvent| {
            let client = client.clone();
            async move {
                client
                    .publish(event.topic.as_str(), qos, false, event.value.into_bytes())
                    .await
                    .map_err(|err| {
                        ConnectorError::with_source(
                            ConnectorErrorKind::Deliver,
                            format!("publish on {} failed", event.topic),
                            err,
                        )
                    })
            }
            .boxed()
        }))
    }

    async fn build_inbound_stream(
        &self,
        connection: &MqttConnection,
    ) -> Result<RawEventStream, ConnectorError> {
        let receiver = lock(&connection.inbound).take().ok_or_else(|| {
            ConnectorError::new(
                ConnectorErrorKind::Inbound,
                "inbound stream of this connection was already taken",
            )
        })?;
        Ok(stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
        .boxed())
    }

    async fn subscribe(
        &self,
        connection: &MqttConnection,
        topic: &TopicName,
    ) -> Result<(), ConnectorError> {
        connection
            .client
            .subscribe(topic.as_str(), connection.qos)
            .await
            .map_err(|err| {
                ConnectorError::with_source(
                    ConnectorErrorKind::Subscribe,
                    format!("subscribe to {topic} failed"),
                    err,
                )
            })?;
        connection.topics.insert(topic);
        Ok(())
    }

    async fn unsubscribe(
        &self,
        connection: &MqttConnection,
        topic: &TopicName,
    ) -> Result<(), ConnectorError> {
        connection.topics.remove(topic);
        connection
            .client
            .unsubscribe(topic.as_str())
            .await
            .map_err(|err| {
                ConnectorError::with_source(
                    ConnectorErrorKind::Unsubscribe,
                    format!("unsubscribe from {topic} failed"),
                    err,
                )
            })
    }
}
