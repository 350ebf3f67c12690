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

use crate::error::BoxError;
use crate::topic::{RawEvent, TopicName};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Stream of raw events read from the transport.
pub type RawEventStream = BoxStream<'static, RawEvent>;

/// Function called once per outbound event; resolves once the transport took the event.
pub type DeliverFn =
    Arc<dyn Fn(RawEvent) -> BoxFuture<'static, Result<(), ConnectorError>> + Send + Sync>;

/// Connector operation that failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectorErrorKind {
    Open,
    Close,
    Subscribe,
    Unsubscribe,
    Deliver,
    Inbound,
}

impl Display for ConnectorErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectorErrorKind::Open => "open",
            ConnectorErrorKind::Close => "close",
            ConnectorErrorKind::Subscribe => "subscribe",
            ConnectorErrorKind::Unsubscribe => "unsubscribe",
            ConnectorErrorKind::Deliver => "deliver",
            ConnectorErrorKind::Inbound => "inbound",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`Connector`] implementation.
pub struct ConnectorError {
    kind: ConnectorErrorKind,
    message: String,
    source: Option<BoxError>,
}

impl ConnectorError {
    pub fn new(kind: ConnectorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ConnectorErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ConnectorErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Debug for ConnectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl Display for ConnectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{} failed: {}: {}", self.kind, self.message, source),
            None => write!(f, "{} failed: {}", self.kind, self.message),
        }
    }
}

impl Error for ConnectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}

/// [`Connector`] is the transport capability the switch drives.
///
/// The switch owns the returned [`Connection`][Connector::Connection] exclusively between
/// `start()` and `stop()` and never shares it with other components. All multiplexing
/// (per-topic dispatch, ordering, bookkeeping) lives in the switch; a connector only
/// moves raw events and issues single-topic (un)subscriptions.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use futures::{FutureExt, StreamExt};
/// use std::sync::Arc;
/// use topic_switch::{Connector, ConnectorError, DeliverFn, RawEvent, RawEventStream, TopicName};
///
/// /// Connector that accepts everything and never produces inbound events.
/// struct BlackHole;
///
/// #[async_trait]
/// impl Connector for BlackHole {
///     type Connection = ();
///
///     async fn open(&self) -> Result<(), ConnectorError> {
///         Ok(())
///     }
///
///     async fn close(&self, _connection: &()) -> Result<(), ConnectorError> {
///         Ok(())
///     }
///
///     async fn build_deliver_fn(&self, _connection: &()) -> Result<DeliverFn, ConnectorError> {
///         Ok(Arc::new(|_event: RawEvent| {
///             async { Ok::<(), ConnectorError>(()) }.boxed()
///         }))
///     }
///
///     async fn build_inbound_stream(
///         &self,
///         _connection: &(),
///     ) -> Result<RawEventStream, ConnectorError> {
///         Ok(futures::stream::pending().boxed())
///     }
///
///     async fn subscribe(&self, _connection: &(), _topic: &TopicName) -> Result<(), ConnectorError> {
///         Ok(())
///     }
///
///     async fn unsubscribe(
///         &self,
///         _connection: &(),
///         _topic: &TopicName,
///     ) -> Result<(), ConnectorError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Live transport handle produced by [`open`][Connector::open].
    type Connection: Send + Sync + 'static;

    /// Establishes the transport. A failure surfaces from `TopicSwitch::start()`.
    async fn open(&self) -> Result<Self::Connection, ConnectorError>;

    /// Tears the transport down. Must tolerate an already closed connection.
    async fn close(&self, connection: &Self::Connection) -> Result<(), ConnectorError>;

    /// Returns the function called once per outbound event.
    async fn build_deliver_fn(
        &self,
        connection: &Self::Connection,
    ) -> Result<DeliverFn, ConnectorError>;

    /// Returns the stream of every event received on the transport.
    async fn build_inbound_stream(
        &self,
        connection: &Self::Connection,
    ) -> Result<RawEventStream, ConnectorError>;

    async fn subscribe(
        &self,
        connection: &Self::Connection,
        topic: &TopicName,
    ) -> Result<(), ConnectorError>;

    async fn unsubscribe(
        &self,
        connection: &Self::Connection,
        topic: &TopicName,
    ) -> Result<(), ConnectorError>;
}
