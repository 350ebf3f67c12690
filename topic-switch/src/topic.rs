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

use crate::error::SwitchError;
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Multi-level wildcard marker. Topics ending with it are not addressable.
pub const WILDCARD_MARKER: char = '#';

///
/// [`TopicName`] identifies one channel on the transport.
///
/// Only direct topics are supported: a name ending with the wildcard marker `#`
/// is rejected, as is the empty name.
///
/// # Examples
///
/// ```
/// use topic_switch::TopicName;
///
/// let topic = TopicName::new("/devices/wb-mr6c_1/controls/K1").unwrap();
/// assert_eq!(topic.as_str(), "/devices/wb-mr6c_1/controls/K1");
///
/// assert!(TopicName::new("/devices/#").is_err());
/// assert!(TopicName::new("").is_err());
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct TopicName(Arc<str>);

impl TopicName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, SwitchError> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(SwitchError::InvalidTopic(name.to_string()));
        }
        if name.ends_with(WILDCARD_MARKER) {
            return Err(SwitchError::WildcardTopic(name.to_string()));
        }
        Ok(Self(Arc::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TopicName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TopicName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for TopicName {
    type Error = SwitchError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for TopicName {
    type Error = SwitchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&TopicName> for TopicName {
    type Error = SwitchError;

    fn try_from(value: &TopicName) -> Result<Self, Self::Error> {
        Ok(value.clone())
    }
}

/// Wire-level event: the only shape that crosses the transport boundary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawEvent {
    pub topic: TopicName,
    pub value: String,
}

impl RawEvent {
    pub fn new(topic: TopicName, value: impl Into<String>) -> Self {
        Self {
            topic,
            value: value.into(),
        }
    }
}

impl Display for RawEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{}", self.topic, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::{RawEvent, TopicName};
    use crate::error::SwitchError;

    #[test]
    fn topic_name_rejects_trailing_wildcard() {
        let err = TopicName::new("foo/#").expect_err("wildcard must be rejected");
        assert!(matches!(err, SwitchError::WildcardTopic(name) if name == "foo/#"));
    }

    #[test]
    fn topic_name_accepts_inner_hash() {
        let topic = TopicName::new("foo/#/bar").expect("only a trailing marker is a wildcard");
        assert_eq!(topic.as_str(), "foo/#/bar");
    }

    #[test]
    fn topic_name_rejects_empty_name() {
        assert!(matches!(
            TopicName::new(""),
            Err(SwitchError::InvalidTopic(_))
        ));
    }

    #[test]
    fn raw_event_display_is_compact() {
        let event = RawEvent::new(TopicName::new("A").unwrap(), "1");
        assert_eq!(event.to_string(), "[A]:1");
    }
}
