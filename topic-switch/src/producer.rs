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

//! Write-only producer view handed out by the switch.

use crate::data_plane::topic_registry::TopicObserver;
use crate::observability::events;
use crate::topic::{RawEvent, TopicName};
use crate::topic_switch::SwitchCore;
use crate::unprocessed::UnprocessedEvent;
use futures::{Stream, StreamExt};
use std::fmt::Debug;
use std::sync::{Arc, Weak};
use tracing::debug;

const COMPONENT: &str = "producer";

///
/// [`TopicProducer`] encodes values and queues them for delivery on its topic.
///
/// All producers of one topic share the same serializer. Writes of one topic are
/// delivered in the order they were sent. A value the serializer rejects is reported
/// to the outbound sink and dropped.
pub struct TopicProducer<V> {
    topic: TopicName,
    observer: Arc<TopicObserver<V>>,
    core: Weak<SwitchCore>,
}

impl<V> Clone for TopicProducer<V> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            observer: self.observer.clone(),
            core: self.core.clone(),
        }
    }
}

impl<V: Debug + Send + Sync + 'static> TopicProducer<V> {
    pub(crate) fn new(observer: Arc<TopicObserver<V>>, core: Weak<SwitchCore>) -> Self {
        Self {
            topic: observer.topic.clone(),
            observer,
            core,
        }
    }

    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    /// Encodes `value` and queues it. Never blocks.
    ///
    /// While the switch is stopped the write is retained in the replay buffer and
    /// delivered on the next start.
    pub fn send(&self, value: V) {
        let Some(core) = self.core.upgrade() else {
            debug!(
                event = events::PRODUCER_DETACHED,
                component = COMPONENT,
                topic = self.topic.as_str(),
                "switch is gone; dropping value"
            );
            return;
        };

        match (self.observer.serializer)(&value) {
            Ok(encoded) => core.publish(RawEvent::new(self.topic.clone(), encoded)),
            Err(cause) => core.options().outbound_sink.emit(
                UnprocessedEvent::serialize_failure(self.topic.clone(), &value, &cause),
            ),
        }
    }

    /// Sends every value of `values` until the stream ends.
    pub async fn forward<S>(&self, values: S)
    where
        S: Stream<Item = V>,
    {
        futures::pin_mut!(values);
        while let Some(value) = values.next().await {
            self.send(value);
        }
    }
}
