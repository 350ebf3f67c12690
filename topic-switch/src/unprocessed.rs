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

//! Recoverable per-event failures and the sinks that receive them.

use crate::error::BoxError;
use crate::observability::{events, fields};
use crate::topic::{RawEvent, TopicName};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "unprocessed";

/// Placeholder value carried by events whose value could not be serialized.
pub const UNDEFINED_VALUE: &str = "<undefined>";

/// Why an event was dropped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum UnprocessedCode {
    /// Inbound event for a topic nobody consumes.
    Unexpected = 1,
    /// The topic parser rejected the inbound value.
    ParseFailure = 2,
    /// The topic serializer rejected the outbound value.
    SerializeFailure = 4,
}

impl UnprocessedCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Display for UnprocessedCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Description of an event the switch could not process. Never stored by the switch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnprocessedEvent {
    pub code: UnprocessedCode,
    pub reason: String,
    pub event: RawEvent,
}

impl UnprocessedEvent {
    pub(crate) fn unexpected(event: RawEvent) -> Self {
        Self {
            code: UnprocessedCode::Unexpected,
            reason: format!("Event from topic: {} wasn't requested", event.topic),
            event,
        }
    }

    pub(crate) fn parse_failure(event: RawEvent, cause: &BoxError) -> Self {
        Self {
            code: UnprocessedCode::ParseFailure,
            reason: format!("Can't parse value. Because {cause}"),
            event,
        }
    }

    pub(crate) fn serialize_failure<V: Debug>(
        topic: TopicName,
        value: &V,
        cause: &BoxError,
    ) -> Self {
        Self {
            code: UnprocessedCode::SerializeFailure,
            reason: format!("Can't serialize value {value:?}. Because {cause}"),
            event: RawEvent::new(topic, UNDEFINED_VALUE),
        }
    }
}

impl Display for UnprocessedEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Error: {} {}. Reason: {}",
            self.code, self.event, self.reason
        )
    }
}

/// Callback receiving [`UnprocessedEvent`]s.
#[derive(Clone)]
pub struct UnprocessedSink(Arc<dyn Fn(UnprocessedEvent) + Send + Sync>);

impl UnprocessedSink {
    pub fn new(sink: impl Fn(UnprocessedEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(sink))
    }

    /// Sink that reports through `tracing` at warn level.
    pub fn log() -> Self {
        Self::new(|unprocessed| {
            warn!(
                event = unprocessed_event_name(unprocessed.code),
                component = COMPONENT,
                code = unprocessed.code.as_u8(),
                topic = unprocessed.event.topic.as_str(),
                value = %fields::format_value(&unprocessed.event.value),
                reason = unprocessed.reason.as_str(),
                "dropping unprocessed event"
            );
        })
    }

    pub fn emit(&self, unprocessed: UnprocessedEvent) {
        (self.0)(unprocessed)
    }
}

impl Default for UnprocessedSink {
    fn default() -> Self {
        Self::log()
    }
}

impl Debug for UnprocessedSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnprocessedSink").finish_non_exhaustive()
    }
}

fn unprocessed_event_name(code: UnprocessedCode) -> &'static str {
    match code {
        UnprocessedCode::Unexpected => events::INGRESS_UNEXPECTED_TOPIC,
        UnprocessedCode::ParseFailure => events::INGRESS_PARSE_FAILED,
        UnprocessedCode::SerializeFailure => events::EGRESS_SERIALIZE_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::{UnprocessedCode, UnprocessedEvent, UnprocessedSink, UNDEFINED_VALUE};
    use crate::error::BoxError;
    use crate::topic::{RawEvent, TopicName};
    use std::sync::{Arc, Mutex};

    #[test]
    fn codes_keep_wire_values() {
        assert_eq!(UnprocessedCode::Unexpected.as_u8(), 1);
        assert_eq!(UnprocessedCode::ParseFailure.as_u8(), 2);
        assert_eq!(UnprocessedCode::SerializeFailure.as_u8(), 4);
    }

    #[test]
    fn serialize_failure_hides_value_behind_placeholder() {
        let cause: BoxError = "negative".into();
        let unprocessed =
            UnprocessedEvent::serialize_failure(TopicName::new("C").unwrap(), &-1i64, &cause);

        assert_eq!(unprocessed.code, UnprocessedCode::SerializeFailure);
        assert_eq!(unprocessed.event.value, UNDEFINED_VALUE);
        assert!(unprocessed.reason.contains("-1"));
        assert!(unprocessed.reason.contains("negative"));
    }

    #[test]
    fn custom_sink_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_sink = seen.clone();
        let sink = UnprocessedSink::new(move |unprocessed| {
            seen_in_sink.lock().unwrap().push(unprocessed);
        });

        let event = RawEvent::new(TopicName::new("X").unwrap(), "1");
        sink.emit(UnprocessedEvent::unexpected(event.clone()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code, UnprocessedCode::Unexpected);
        assert_eq!(seen[0].event, event);
    }
}
