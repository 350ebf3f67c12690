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

//! Loopback connector driven by hand, for tests and embedding without a broker.

use crate::connector::{
    Connector, ConnectorError, ConnectorErrorKind, DeliverFn, RawEventStream,
};
use crate::error::SwitchError;
use crate::topic::{RawEvent, TopicName};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Notify;
use tracing::{debug, warn};

const COMPONENT: &str = "in_memory_connector";
const INBOUND_CAPACITY: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by [`InMemoryConnector::open`].
#[derive(Debug)]
pub struct InMemoryConnection {
    id: u64,
}

impl InMemoryConnection {
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct Inner {
    inbound: broadcast::Sender<RawEvent>,
    consumed: Mutex<Vec<RawEvent>>,
    consumed_changed: Notify,
    subscribed: Mutex<BTreeSet<TopicName>>,
    delivery_delay: Mutex<Duration>,
    fail_open: AtomicBool,
    open: AtomicBool,
    open_count: AtomicUsize,
    next_connection: AtomicU64,
}

///
/// [`InMemoryConnector`] is a [`Connector`] without a transport.
///
/// Events injected with [`event`][InMemoryConnector::event] show up on the inbound
/// stream of the open connection, whatever the subscribed topics. Delivered events are
/// recorded and can be read back with
/// [`consumed_events`][InMemoryConnector::consumed_events]. Clones share state.
#[derive(Clone)]
pub struct InMemoryConnector {
    inner: Arc<Inner>,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnector {
    pub fn new() -> Self {
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                inbound,
                consumed: Mutex::new(Vec::new()),
                consumed_changed: Notify::new(),
                subscribed: Mutex::new(BTreeSet::new()),
                delivery_delay: Mutex::new(Duration::ZERO),
                fail_open: AtomicBool::new(false),
                open: AtomicBool::new(false),
                open_count: AtomicUsize::new(0),
                next_connection: AtomicU64::new(1),
            }),
        }
    }

    /// Injects an inbound event. Dropped when no connection is reading.
    pub fn event(&self, topic: impl AsRef<str>, value: impl Into<String>) -> Result<(), SwitchError> {
        let event = RawEvent::new(TopicName::new(topic)?, value);
        if let Err(broadcast::error::SendError(dropped)) = self.inner.inbound.send(event) {
            debug!(
                component = COMPONENT,
                topic = dropped.topic.as_str(),
                "no open connection; dropping injected event"
            );
        }
        Ok(())
    }

    /// Every event delivered so far, in delivery order.
    pub fn consumed_events(&self) -> Vec<RawEvent> {
        lock(&self.inner.consumed).clone()
    }

    /// Resolves once at least `count` events were delivered.
    pub async fn wait_for_consumed_events(&self, count: usize) {
        loop {
            let changed = self.inner.consumed_changed.notified();
            if lock(&self.inner.consumed).len() >= count {
                return;
            }
            changed.await;
        }
    }

    pub fn subscribed_topics(&self) -> Vec<TopicName> {
        lock(&self.inner.subscribed).iter().cloned().collect()
    }

    /// Makes every later delivery take `delay` after being recorded.
    pub fn set_delivery_delay(&self, delay: Duration) {
        *lock(&self.inner.delivery_delay) = delay;
    }

    /// Makes every later `open()` fail until reset.
    pub fn set_open_failure(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Connection = InMemoryConnection;

    async fn open(&self) -> Result<InMemoryConnection, ConnectorError> {
        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(ConnectorError::new(
                ConnectorErrorKind::Open,
                "open failure requested",
            ));
        }
        self.inner.open.store(true, Ordering::SeqCst);
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection {
            id: self.inner.next_connection.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn close(&self, _connection: &InMemoryConnection) -> Result<(), ConnectorError> {
        self.inner.open.store(false, Ordering::SeqCst);
        lock(&self.inner.subscribed).clear();
        Ok(())
    }

    async fn build_deliver_fn(
        &self,
        _connection: &InMemoryConnection,
    ) -> Result<DeliverFn, ConnectorError> {
        let inner = self.inner.clone();
        Ok(Arc::new(move |event: RawEvent| {
            let inner = inner.clone();
            async move {
                lock(&inner.consumed).push(event);
                inner.consumed_changed.notify_waiters();
                let delay = *lock(&inner.delivery_delay);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(())
            }
            .boxed()
        }))
    }

    async fn build_inbound_stream(
        &self,
        connection: &InMemoryConnection,
    ) -> Result<RawEventStream, ConnectorError> {
        let receiver = self.inner.inbound.subscribe();
        let id = connection.id;
        Ok(stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => warn!(
                        component = COMPONENT,
                        connection = id,
                        skipped,
                        "inbound reader lagged; events lost"
                    ),
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed())
    }

    async fn subscribe(
        &self,
        _connection: &InMemoryConnection,
        topic: &TopicName,
    ) -> Result<(), ConnectorError> {
        lock(&self.inner.subscribed).insert(topic.clone());
        Ok(())
    }

    async fn unsubscribe(
        &self,
        _connection: &InMemoryConnection,
        topic: &TopicName,
    ) -> Result<(), ConnectorError> {
        lock(&self.inner.subscribed).remove(topic);
        Ok(())
    }
}
