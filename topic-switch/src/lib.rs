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

//! # topic-switch
//!
//! `topic-switch` multiplexes one topic-addressed pub/sub connection (an MQTT client,
//! an in-process bus) between many typed consumers and producers.
//!
//! Typical usage is API-first and centered on [`TopicSwitch`] and a [`Connector`]
//! implementation. Internal modules are organized by layer: the control plane owns
//! transport subscriptions, the data plane moves events in and out.
//!
//! ## Fan-in
//!
//! ```
//! use futures::StreamExt;
//! use topic_switch::{codec, InMemoryConnector, SwitchOptions, TopicSwitch};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let connector = InMemoryConnector::new();
//! let switch = TopicSwitch::new("fan-in", connector.clone(), SwitchOptions::default()).unwrap();
//!
//! let a = switch.create_hot_topic_consumer("A", codec::from_str::<i64>(), -1).unwrap();
//! let b = switch.create_hot_topic_consumer("B", codec::from_str::<i64>(), -1).unwrap();
//! let sum = switch.create_topic_producer("C", codec::display::<i64>()).unwrap();
//! switch.start().await.unwrap();
//!
//! let mut a_changes = a.changes();
//! a_changes.next().await;
//! connector.event("A", "20").unwrap();
//! a_changes.next().await;
//!
//! sum.send(a.value() + b.value());
//! switch.stop().await.unwrap();
//!
//! assert_eq!(connector.consumed_events()[0].value, "19");
//! # });
//! ```

pub mod codec;
mod config;
mod connector;
mod consumer;
pub(crate) mod control_plane;
pub(crate) mod data_plane;
mod error;
mod in_memory;
pub mod observability;
pub mod primitives;
mod producer;
mod topic;
mod topic_switch;
mod unprocessed;

pub use codec::{TopicValueParser, TopicValueSerializer};
pub use config::{
    ConfigError, SwitchConfig, SwitchOptions, DEFAULT_OUTBOUND_CONCURRENCY,
    DEFAULT_REPLAY_BUFFER_SIZE,
};
pub use connector::{Connector, ConnectorError, ConnectorErrorKind, DeliverFn, RawEventStream};
pub use consumer::{ColdTopicConsumer, HotTopicConsumer};
pub use error::{BoxError, ConsumerKind, SwitchError};
pub use in_memory::{InMemoryConnection, InMemoryConnector};
pub use producer::TopicProducer;
pub use topic::{RawEvent, TopicName, WILDCARD_MARKER};
pub use topic_switch::TopicSwitch;
pub use unprocessed::{UnprocessedCode, UnprocessedEvent, UnprocessedSink, UNDEFINED_VALUE};
