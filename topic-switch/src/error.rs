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

//! Caller-facing failures of the switch.
//!
//! Per-event failures (unexpected topic, parse and serialize failures) never show up
//! here; they are reported through [`UnprocessedEvent`][crate::UnprocessedEvent] sinks.

use crate::connector::ConnectorError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Boxed error used for parser/serializer failures and connector causes.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Which flavour of consumer owns a topic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsumerKind {
    Cold,
    Hot,
}

impl Display for ConsumerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerKind::Cold => f.write_str("cold"),
            ConsumerKind::Hot => f.write_str("hot"),
        }
    }
}

/// Failures surfaced synchronously to the caller of a switch operation.
#[derive(Debug)]
pub enum SwitchError {
    /// Topic name ends with the wildcard marker.
    WildcardTopic(String),
    /// Topic name is not addressable (empty).
    InvalidTopic(String),
    /// The topic already has a consumer of the other kind.
    ConsumerKindMismatch {
        topic: String,
        existing: ConsumerKind,
        requested: ConsumerKind,
    },
    /// The topic already has a consumer/producer carrying a different value type.
    ValueTypeMismatch { topic: String },
    /// Subscribe requested for a topic that is already live on the transport.
    AlreadySubscribed(String),
    /// Unsubscribe requested for a topic that is neither live nor deferred.
    NotSubscribed(String),
    /// Subscribe requested for a topic already waiting in the deferred backlog.
    AlreadyDeferred(String),
    AlreadyStarted,
    Connector(ConnectorError),
}

impl Display for SwitchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchError::WildcardTopic(topic) => {
                write!(f, "wildcard topic subscriptions are not supported: {topic}")
            }
            SwitchError::InvalidTopic(topic) => write!(f, "invalid topic name: {topic:?}"),
            SwitchError::ConsumerKindMismatch {
                topic,
                existing,
                requested,
            } => write!(
                f,
                "topic {topic} already has a {existing} consumer, {requested} requested"
            ),
            SwitchError::ValueTypeMismatch { topic } => {
                write!(f, "topic {topic} is already bound to another value type")
            }
            SwitchError::AlreadySubscribed(topic) => write!(f, "topic {topic} already listened"),
            SwitchError::NotSubscribed(topic) => write!(f, "topic {topic} not yet listened"),
            SwitchError::AlreadyDeferred(topic) => {
                write!(f, "topic {topic} already waits for subscription")
            }
            SwitchError::AlreadyStarted => write!(f, "switch already started"),
            SwitchError::Connector(err) => write!(f, "connector failure: {err}"),
        }
    }
}

impl Error for SwitchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SwitchError::Connector(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConnectorError> for SwitchError {
    fn from(err: ConnectorError) -> Self {
        SwitchError::Connector(err)
    }
}
