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

use crate::codec::{boxed_parser, boxed_serializer, TopicValueParser};
use crate::config::{ConfigError, SwitchOptions};
use crate::connector::{Connector, ConnectorError};
use crate::consumer::{ColdTopicConsumer, HotTopicConsumer};
use crate::control_plane::subscription_ledger::{
    SubscribeTransition, SubscriptionLedger, UnsubscribeTransition,
};
use crate::control_plane::subscription_worker::{SubscriptionQueue, SubscriptionWorker};
use crate::data_plane::egress_pool::EgressPool;
use crate::data_plane::ingress_dispatcher::IngressDispatcher;
use crate::data_plane::topic_registry::{
    ColdSubject, HotSubject, SubscriptionHook, TopicObserver, TopicRegistry, TopicSubject,
};
use crate::error::{BoxError, ConsumerKind, SwitchError};
use crate::observability::{events, fields};
use crate::primitives::WaitableQueue;
use crate::producer::TopicProducer;
use crate::topic::{RawEvent, TopicName};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMPONENT: &str = "topic_switch";

/// Bookkeeping guarded by the switch lock. Never held across an `.await`.
struct SwitchState {
    ledger: SubscriptionLedger,
    subscriptions: Option<SubscriptionQueue>,
    registry: TopicRegistry,
    egress: Option<EgressPool>,
    replay: VecDeque<RawEvent>,
}

impl SwitchState {
    fn start_subscription(&mut self, switch: &str, topic: &TopicName) -> Result<(), SwitchError> {
        match self.ledger.request_subscribe(topic) {
            Ok(SubscribeTransition::Apply) => {
                if let Some(subscriptions) = &self.subscriptions {
                    subscriptions.subscribe(topic.clone());
                }
                Ok(())
            }
            Ok(SubscribeTransition::Deferred) => {
                debug!(
                    event = events::SUBSCRIPTION_DEFERRED,
                    component = COMPONENT,
                    switch,
                    topic = topic.as_str(),
                    "switch stopped; subscription deferred"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    event = events::SUBSCRIPTION_TRANSITION_REJECTED,
                    component = COMPONENT,
                    switch,
                    topic = topic.as_str(),
                    err = %err,
                    "subscribe rejected"
                );
                Err(err)
            }
        }
    }

    fn stop_subscription(&mut self, switch: &str, topic: &TopicName) -> Result<(), SwitchError> {
        match self.ledger.request_unsubscribe(topic) {
            Ok(UnsubscribeTransition::Apply) => {
                if let Some(subscriptions) = &self.subscriptions {
                    subscriptions.unsubscribe(topic.clone());
                }
                Ok(())
            }
            Ok(UnsubscribeTransition::DeferralCancelled) => {
                debug!(
                    event = events::SUBSCRIPTION_DEFERRAL_CANCELLED,
                    component = COMPONENT,
                    switch,
                    topic = topic.as_str(),
                    "deferred subscription cancelled"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    event = events::SUBSCRIPTION_TRANSITION_REJECTED,
                    component = COMPONENT,
                    switch,
                    topic = topic.as_str(),
                    err = %err,
                    "unsubscribe rejected"
                );
                Err(err)
            }
        }
    }
}

/// Connector-independent half of the switch, shared with pipelines and views.
pub(crate) struct SwitchCore {
    name: Arc<str>,
    options: SwitchOptions,
    in_flight: Arc<WaitableQueue>,
    state: Mutex<SwitchState>,
}

impl SwitchCore {
    fn lock_state(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn options(&self) -> &SwitchOptions {
        &self.options
    }

    pub(crate) fn subject(&self, topic: &TopicName) -> Option<Arc<dyn TopicSubject>> {
        self.lock_state().registry.subject(topic)
    }

    pub(crate) fn start_subscription(&self, topic: &TopicName) -> Result<(), SwitchError> {
        self.lock_state().start_subscription(&self.name, topic)
    }

    pub(crate) fn stop_subscription(&self, topic: &TopicName) -> Result<(), SwitchError> {
        self.lock_state().stop_subscription(&self.name, topic)
    }

    /// Hands an encoded write to the outbound pipeline, or to the replay buffer while
    /// no pipeline is attached.
    pub(crate) fn publish(&self, event: RawEvent) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if let Some(egress) = state.egress.as_mut() {
            egress.submit(event);
            return;
        }

        if state.replay.len() >= self.options.config.replay_buffer_size {
            if let Some(dropped) = state.replay.pop_front() {
                warn!(
                    event = events::EGRESS_REPLAY_OVERFLOW,
                    component = COMPONENT,
                    switch = self.name(),
                    topic = dropped.topic.as_str(),
                    value = %fields::format_value(&dropped.value),
                    "replay buffer full; dropping oldest write"
                );
            }
        }
        debug!(
            event = events::EGRESS_REPLAY_BUFFERED,
            component = COMPONENT,
            switch = self.name(),
            topic = event.topic.as_str(),
            buffered = state.replay.len() + 1,
            "switch stopped; write buffered"
        );
        state.replay.push_back(event);
    }

    /// Connects the bookkeeping to a fresh session: replays the deferred backlog and
    /// the buffered writes.
    fn attach(&self, subscriptions: SubscriptionQueue, mut egress: EgressPool) {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let replayed = state.ledger.connect();
        if !replayed.is_empty() {
            debug!(
                event = events::SUBSCRIPTION_REPLAY,
                component = COMPONENT,
                switch = self.name(),
                topics = %fields::format_topics(replayed.iter()),
                "replaying deferred subscriptions"
            );
        }
        for topic in replayed {
            subscriptions.subscribe(topic);
        }

        for event in std::mem::take(&mut state.replay) {
            egress.submit(event);
        }

        state.subscriptions = Some(subscriptions);
        state.egress = Some(egress);
    }

    fn detach_egress(&self) -> Option<EgressPool> {
        self.lock_state().egress.take()
    }

    /// Unsubscribes every live topic and keeps it in the backlog for the next start.
    fn passivate(&self) -> Vec<TopicName> {
        let mut state = self.lock_state();
        let passivated = state.ledger.passivate();
        if let Some(subscriptions) = state.subscriptions.take() {
            for topic in &passivated {
                subscriptions.unsubscribe(topic.clone());
            }
        }
        passivated
    }
}

fn subscription_hooks(core: &Arc<SwitchCore>, topic: &TopicName) -> (SubscriptionHook, SubscriptionHook) {
    let (start_core, start_topic) = (Arc::downgrade(core), topic.clone());
    let (stop_core, stop_topic) = (Arc::downgrade(core), topic.clone());
    (
        Box::new(move || match start_core.upgrade() {
            Some(core) => core.start_subscription(&start_topic),
            None => Ok(()),
        }),
        Box::new(move || match stop_core.upgrade() {
            Some(core) => core.stop_subscription(&stop_topic),
            None => Ok(()),
        }),
    )
}

/// Connection opened by a `start()` that has not stored its session yet.
///
/// Dropped while armed, the connection is closed on a background task.
struct PendingConnection<C: Connector> {
    connector: Arc<C>,
    connection: Arc<C::Connection>,
    switch: Arc<str>,
    armed: bool,
}

impl<C: Connector> PendingConnection<C> {
    fn new(connector: Arc<C>, connection: C::Connection, switch: Arc<str>) -> Self {
        Self {
            connector,
            connection: Arc::new(connection),
            switch,
            armed: true,
        }
    }

    fn connection(&self) -> &Arc<C::Connection> {
        &self.connection
    }

    fn release(mut self) -> Arc<C::Connection> {
        self.armed = false;
        self.connection.clone()
    }
}

impl<C: Connector> Drop for PendingConnection<C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(
            event = events::SWITCH_START_ABANDONED,
            component = COMPONENT,
            switch = &*self.switch,
            "start abandoned; closing its connection"
        );
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let (connector, connection) = (self.connector.clone(), self.connection.clone());
        let switch = self.switch.clone();
        runtime.spawn(async move {
            if let Err(err) = connector.close(&connection).await {
                warn!(
                    event = events::CONNECTION_CLOSE_FAILED,
                    component = COMPONENT,
                    switch = &*switch,
                    err = %err,
                    "unable to close connection"
                );
            }
        });
    }
}

/// Resources of one `start()`..`stop()` cycle.
struct Session<C: Connector> {
    connection: Arc<C::Connection>,
    subscriptions: SubscriptionWorker,
    inbound: JoinHandle<()>,
}

///
/// [`TopicSwitch`] multiplexes one transport connection between many typed,
/// per-topic consumers and producers.
///
/// Consumers and producers can be created before or after [`start`][TopicSwitch::start].
/// Transport subscriptions follow consumer demand: hot consumers keep their topic
/// subscribed while the switch runs, cold consumers only while a reader is attached.
/// [`stop`][TopicSwitch::stop] drains every queued write, then unsubscribes and
/// remembers the live topics so that the next `start()` restores them.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use topic_switch::{codec, InMemoryConnector, SwitchOptions, TopicSwitch};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let connector = InMemoryConnector::new();
/// let switch = TopicSwitch::new("doc", connector.clone(), SwitchOptions::default()).unwrap();
/// switch.start().await.unwrap();
///
/// let relay = switch
///     .create_cold_topic_consumer("relay/K1", codec::switch())
///     .unwrap();
/// let mut states = relay.changes().unwrap();
///
/// connector.event("relay/K1", "1").unwrap();
/// assert_eq!(states.next().await, Some(true));
///
/// let command = switch
///     .create_topic_producer("relay/K1/on", codec::switch_serializer())
///     .unwrap();
/// command.send(false);
///
/// switch.stop().await.unwrap();
/// assert_eq!(connector.consumed_events()[0].value, "0");
/// # });
/// ```
pub struct TopicSwitch<C: Connector> {
    connector: Arc<C>,
    core: Arc<SwitchCore>,
    session: tokio::sync::Mutex<Option<Session<C>>>,
}

impl<C: Connector> TopicSwitch<C> {
    pub fn new(name: &str, connector: C, options: SwitchOptions) -> Result<Self, ConfigError> {
        options.config.validate()?;
        debug!(
            event = events::SWITCH_CREATE,
            component = COMPONENT,
            switch = name,
            outbound_concurrency = options.config.outbound_concurrency,
            replay_buffer_size = options.config.replay_buffer_size,
            "switch created"
        );

        Ok(Self {
            connector: Arc::new(connector),
            core: Arc::new(SwitchCore {
                name: Arc::from(name),
                options,
                in_flight: Arc::new(WaitableQueue::new()),
                state: Mutex::new(SwitchState {
                    ledger: SubscriptionLedger::new(),
                    subscriptions: None,
                    registry: TopicRegistry::new(),
                    egress: None,
                    replay: VecDeque::new(),
                }),
            }),
            session: tokio::sync::Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn options(&self) -> &SwitchOptions {
        self.core.options()
    }

    pub fn is_started(&self) -> bool {
        self.core.lock_state().ledger.is_connected()
    }

    /// Topics currently live on the transport.
    pub fn subscribed_topics(&self) -> Vec<TopicName> {
        self.core.lock_state().ledger.subscribed()
    }

    /// Topics waiting for the next `start()`, in replay order.
    pub fn deferred_topics(&self) -> Vec<TopicName> {
        self.core.lock_state().ledger.deferred()
    }

    pub fn consumer_topics(&self) -> Vec<TopicName> {
        self.core.lock_state().registry.consumer_topics()
    }

    pub fn producer_topics(&self) -> Vec<TopicName> {
        self.core.lock_state().registry.producer_topics()
    }

    /// Writes handed to the connector whose delivery has not completed yet.
    pub fn in_flight(&self) -> usize {
        self.core.in_flight.len()
    }

    /// Resolves once no outbound delivery is in flight.
    pub async fn wait_pending_events(&self) {
        self.core.in_flight.wait_empty().await;
    }

    /// Resolves once the (un)subscriptions requested so far reached the connector.
    pub async fn flush_subscriptions(&self) {
        let subscriptions = self.core.lock_state().subscriptions.clone();
        if let Some(subscriptions) = subscriptions {
            subscriptions.flush().await;
        }
    }

    /// Opens the connection, wires both pipelines and replays deferred subscriptions
    /// and buffered writes.
    ///
    /// Fails with [`SwitchError::AlreadyStarted`] if called twice without `stop()`, or
    /// with [`SwitchError::Connector`] if the connector cannot open.
    pub async fn start(&self) -> Result<(), SwitchError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(SwitchError::AlreadyStarted);
        }
        let switch = self.name();
        info!(
            event = events::SWITCH_START,
            component = COMPONENT,
            switch,
            "starting switch"
        );

        let pending = match self.connector.open().await {
            Ok(connection) => {
                PendingConnection::new(self.connector.clone(), connection, self.core.name.clone())
            }
            Err(err) => {
                warn!(
                    event = events::SWITCH_START_FAILED,
                    component = COMPONENT,
                    switch,
                    err = %err,
                    "unable to open connection"
                );
                return Err(err.into());
            }
        };

        let pipelines = async {
            let deliver = self.connector.build_deliver_fn(pending.connection()).await?;
            let inbound = self.connector.build_inbound_stream(pending.connection()).await?;
            Ok::<_, ConnectorError>((deliver, inbound))
        }
        .await;
        let (deliver, inbound) = match pipelines {
            Ok(pipelines) => pipelines,
            Err(err) => {
                warn!(
                    event = events::SWITCH_START_FAILED,
                    component = COMPONENT,
                    switch,
                    err = %err,
                    "unable to build pipelines"
                );
                self.close_connection(pending.connection()).await;
                pending.release();
                return Err(err.into());
            }
        };

        // No await until the session is stored: a dropped future must leave either
        // nothing or a complete session behind.
        let connection = pending.release();
        let subscriptions = SubscriptionWorker::spawn(
            self.core.name.clone(),
            self.connector.clone(),
            connection.clone(),
        );
        let egress = EgressPool::new(
            self.core.name.clone(),
            deliver,
            self.core.options.config.outbound_concurrency,
            self.core.in_flight.clone(),
        );
        let inbound = IngressDispatcher::new(&self.core).spawn(inbound);
        let queue = subscriptions.queue();
        self.core.attach(queue.clone(), egress);
        *session = Some(Session {
            connection,
            subscriptions,
            inbound,
        });
        queue.flush().await;

        info!(
            event = events::SWITCH_START_OK,
            component = COMPONENT,
            switch,
            subscribed = %fields::format_topics(self.subscribed_topics().iter()),
            "switch started"
        );
        Ok(())
    }

    /// Drains queued writes, detaches both pipelines, passivates live subscriptions and
    /// closes the connection. Stopping a stopped switch does nothing.
    ///
    /// A failing connector close is logged, not returned.
    pub async fn stop(&self) -> Result<(), SwitchError> {
        let mut session = self.session.lock().await;
        let Some(Session {
            connection,
            subscriptions,
            inbound,
        }) = session.take()
        else {
            return Ok(());
        };
        let switch = self.name();
        info!(
            event = events::SWITCH_STOP,
            component = COMPONENT,
            switch,
            in_flight = self.core.in_flight.len(),
            "stopping switch"
        );

        self.core.in_flight.wait_empty().await;
        if let Some(egress) = self.core.detach_egress() {
            egress.shutdown().await;
        }
        debug!(
            event = events::SWITCH_STOP_DRAINED,
            component = COMPONENT,
            switch,
            "outbound pipeline drained"
        );

        inbound.abort();
        let _ = inbound.await;

        let passivated = self.core.passivate();
        debug!(
            event = events::SUBSCRIPTION_PASSIVATED,
            component = COMPONENT,
            switch,
            topics = %fields::format_topics(passivated.iter()),
            "live subscriptions passivated"
        );
        subscriptions.shutdown().await;
        self.close_connection(&connection).await;

        info!(
            event = events::SWITCH_STOP_OK,
            component = COMPONENT,
            switch,
            "switch stopped"
        );
        Ok(())
    }

    async fn close_connection(&self, connection: &C::Connection) {
        if let Err(err) = self.connector.close(connection).await {
            warn!(
                event = events::CONNECTION_CLOSE_FAILED,
                component = COMPONENT,
                switch = self.name(),
                err = %err,
                "unable to close connection"
            );
        }
    }

    /// Creates or fetches the cold consumer of `topic`.
    ///
    /// The parser is only used when the topic has no consumer yet.
    pub fn create_cold_topic_consumer<V, E, P>(
        &self,
        topic: impl AsRef<str>,
        parser: P,
    ) -> Result<ColdTopicConsumer<V>, SwitchError>
    where
        V: Clone + Send + Sync + 'static,
        P: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let topic = TopicName::new(topic)?;
        let mut state = self.core.lock_state();
        if let Some(subject) = state
            .registry
            .typed_subject::<ColdSubject<V>>(&topic, ConsumerKind::Cold)?
        {
            self.log_consumer(events::CONSUMER_REUSE, &topic, ConsumerKind::Cold);
            return Ok(ColdTopicConsumer::new(topic, subject));
        }

        let (activate, deactivate) = subscription_hooks(&self.core, &topic);
        let subject = Arc::new(ColdSubject::new(boxed_parser(parser), activate, deactivate));
        state.registry.insert_subject(topic.clone(), subject.clone());
        self.log_consumer(events::CONSUMER_CREATE, &topic, ConsumerKind::Cold);
        Ok(ColdTopicConsumer::new(topic, subject))
    }

    /// Creates or fetches the hot consumer of `topic`, seeded with `initial`.
    ///
    /// A new hot consumer subscribes its topic at once, or on the next `start()`.
    pub fn create_hot_topic_consumer<V, E, P>(
        &self,
        topic: impl AsRef<str>,
        parser: P,
        initial: V,
    ) -> Result<HotTopicConsumer<V>, SwitchError>
    where
        V: Clone + Send + Sync + 'static,
        P: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        self.hot_consumer(TopicName::new(topic)?, boxed_parser(parser), initial)
    }

    /// Hot consumer without a seed: `None` until the first value is decoded.
    pub fn create_optional_hot_topic_consumer<V, E, P>(
        &self,
        topic: impl AsRef<str>,
        parser: P,
    ) -> Result<HotTopicConsumer<Option<V>>, SwitchError>
    where
        V: Clone + Send + Sync + 'static,
        P: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let parser = boxed_parser(move |raw: &str| parser(raw).map(Some));
        self.hot_consumer(TopicName::new(topic)?, parser, None)
    }

    fn hot_consumer<V>(
        &self,
        topic: TopicName,
        parser: TopicValueParser<V>,
        initial: V,
    ) -> Result<HotTopicConsumer<V>, SwitchError>
    where
        V: Clone + Send + Sync + 'static,
    {
        let mut state = self.core.lock_state();
        if let Some(subject) = state
            .registry
            .typed_subject::<HotSubject<V>>(&topic, ConsumerKind::Hot)?
        {
            self.log_consumer(events::CONSUMER_REUSE, &topic, ConsumerKind::Hot);
            return Ok(HotTopicConsumer::new(topic, subject));
        }

        state.start_subscription(self.name(), &topic)?;
        let subject = Arc::new(HotSubject::new(parser, initial));
        state.registry.insert_subject(topic.clone(), subject.clone());
        self.log_consumer(events::CONSUMER_CREATE, &topic, ConsumerKind::Hot);
        Ok(HotTopicConsumer::new(topic, subject))
    }

    /// Creates or fetches the producer of `topic`.
    ///
    /// Every producer of a topic shares the serializer given on first creation.
    pub fn create_topic_producer<V, E, S>(
        &self,
        topic: impl AsRef<str>,
        serializer: S,
    ) -> Result<TopicProducer<V>, SwitchError>
    where
        V: Debug + Send + Sync + 'static,
        S: Fn(&V) -> Result<String, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let topic = TopicName::new(topic)?;
        let mut state = self.core.lock_state();
        let (observer, event) = match state.registry.typed_observer::<V>(&topic)? {
            Some(existing) => (existing, events::PRODUCER_REUSE),
            None => {
                let observer = Arc::new(TopicObserver {
                    topic: topic.clone(),
                    serializer: boxed_serializer(serializer),
                });
                state.registry.insert_observer(observer.clone());
                (observer, events::PRODUCER_CREATE)
            }
        };
        drop(state);

        debug!(
            event,
            component = COMPONENT,
            switch = self.name(),
            topic = topic.as_str(),
            "producer ready"
        );
        Ok(TopicProducer::new(observer, Arc::downgrade(&self.core)))
    }

    fn log_consumer(&self, event: &'static str, topic: &TopicName, kind: ConsumerKind) {
        debug!(
            event,
            component = COMPONENT,
            switch = self.name(),
            topic = topic.as_str(),
            kind = %kind,
            "consumer ready"
        );
    }
}
