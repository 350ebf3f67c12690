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

//! Read-only consumer views handed out by the switch.

use crate::data_plane::topic_registry::{ColdSubject, HotSubject};
use crate::error::SwitchError;
use crate::observability::events;
use crate::topic::TopicName;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

const COMPONENT: &str = "consumer";

/// Turns a subject receiver into a stream. `guard` lives as long as the stream.
fn receiver_stream<V, G>(
    topic: TopicName,
    receiver: broadcast::Receiver<V>,
    guard: G,
) -> BoxStream<'static, V>
where
    V: Clone + Send + 'static,
    G: Send + 'static,
{
    stream::unfold(
        (receiver, guard, topic),
        |(mut receiver, guard, topic)| async move {
            loop {
                match receiver.recv().await {
                    Ok(value) => return Some((value, (receiver, guard, topic))),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            event = events::CONSUMER_LAGGED,
                            component = COMPONENT,
                            topic = topic.as_str(),
                            skipped,
                            "consumer fell behind; skipping values"
                        );
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    )
    .boxed()
}

///
/// [`ColdTopicConsumer`] is a view of a topic without a retained value.
///
/// The topic is subscribed on the transport while at least one stream returned by
/// [`changes`][ColdTopicConsumer::changes] is alive, and unsubscribed when the last
/// one is dropped.
pub struct ColdTopicConsumer<V> {
    topic: TopicName,
    subject: Arc<ColdSubject<V>>,
}

impl<V> Clone for ColdTopicConsumer<V> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ColdTopicConsumer<V> {
    pub(crate) fn new(topic: TopicName, subject: Arc<ColdSubject<V>>) -> Self {
        Self { topic, subject }
    }

    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    /// Attaches a reader receiving every value decoded from now on.
    ///
    /// Fails only when the transport subscription is rejected by the switch's
    /// bookkeeping.
    pub fn changes(&self) -> Result<BoxStream<'static, V>, SwitchError> {
        let (lease, receiver) = self.subject.attach()?;
        Ok(receiver_stream(self.topic.clone(), receiver, lease))
    }

    /// Number of live [`changes`][ColdTopicConsumer::changes] streams.
    pub fn reader_count(&self) -> usize {
        self.subject.reader_count()
    }
}

///
/// [`HotTopicConsumer`] is a view of a topic that keeps its last decoded value.
///
/// The topic stays subscribed from creation until the switch stops, whatever the
/// number of readers.
pub struct HotTopicConsumer<V> {
    topic: TopicName,
    subject: Arc<HotSubject<V>>,
}

impl<V> Clone for HotTopicConsumer<V> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> HotTopicConsumer<V> {
    pub(crate) fn new(topic: TopicName, subject: Arc<HotSubject<V>>) -> Self {
        Self { topic, subject }
    }

    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    /// The initial value until the first successful decode, then the latest one.
    pub fn value(&self) -> V {
        self.subject.current()
    }

    /// The current value followed by every later decoded value.
    pub fn changes(&self) -> BoxStream<'static, V> {
        let (current, receiver) = self.subject.watch();
        stream::once(async move { current })
            .chain(receiver_stream(self.topic.clone(), receiver, ()))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColdTopicConsumer, HotTopicConsumer};
    use crate::codec::{self, boxed_parser};
    use crate::data_plane::topic_registry::{
        ColdSubject, HotSubject, TopicSubject, SUBJECT_CHANNEL_CAPACITY,
    };
    use crate::topic::{RawEvent, TopicName};
    use crate::unprocessed::UnprocessedSink;
    use futures::StreamExt;
    use std::sync::Arc;

    fn topic() -> TopicName {
        TopicName::new("sensor").unwrap()
    }

    #[tokio::test]
    async fn hot_changes_start_with_current_value() {
        let subject = Arc::new(HotSubject::new(boxed_parser(codec::from_str::<i32>()), 1));
        let consumer = HotTopicConsumer::new(topic(), subject.clone());
        let mut changes = consumer.changes();

        subject.dispatch(RawEvent::new(topic(), "2"), &UnprocessedSink::default());

        assert_eq!(changes.next().await, Some(1));
        assert_eq!(changes.next().await, Some(2));
        assert_eq!(consumer.value(), 2);
    }

    #[tokio::test]
    async fn lagging_reader_skips_to_retained_values() {
        let subject = Arc::new(HotSubject::new(boxed_parser(codec::from_str::<usize>()), 0));
        let consumer = HotTopicConsumer::new(topic(), subject.clone());
        let mut changes = consumer.changes();

        let sink = UnprocessedSink::default();
        for value in 1..=SUBJECT_CHANNEL_CAPACITY + 5 {
            subject.dispatch(RawEvent::new(topic(), value.to_string()), &sink);
        }

        assert_eq!(changes.next().await, Some(0));
        assert_eq!(changes.next().await, Some(6));
    }

    #[tokio::test]
    async fn cold_stream_holds_activation_until_dropped() {
        let subject = Arc::new(ColdSubject::new(
            boxed_parser(codec::text()),
            Box::new(|| Ok(())),
            Box::new(|| Ok(())),
        ));
        let consumer = ColdTopicConsumer::new(topic(), subject.clone());

        let mut changes = consumer.changes().unwrap();
        assert_eq!(consumer.reader_count(), 1);

        subject.dispatch(RawEvent::new(topic(), "on"), &UnprocessedSink::default());
        assert_eq!(changes.next().await.as_deref(), Some("on"));

        drop(changes);
        assert_eq!(consumer.reader_count(), 0);
    }
}
