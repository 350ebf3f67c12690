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

//! Shared structured field values and value-format helpers.

use crate::topic::TopicName;

pub const NONE: &str = "none";
pub const REASON_STREAM_CLOSED: &str = "stream_closed";
pub const REASON_PIPELINE_DETACHED: &str = "pipeline_detached";

/// Longest value rendered in debug logs before truncation.
pub const MAX_LOGGED_VALUE_LEN: usize = 64;

/// Renders a payload for logs, cutting it on a char boundary.
pub fn format_value(value: &str) -> String {
    if value.len() <= MAX_LOGGED_VALUE_LEN {
        return value.to_string();
    }
    let cut = (0..=MAX_LOGGED_VALUE_LEN)
        .rev()
        .find(|idx| value.is_char_boundary(*idx))
        .unwrap_or(0);
    format!("{}...", &value[..cut])
}

/// Renders a topic list as a compact comma separated string.
pub fn format_topics<'a>(topics: impl IntoIterator<Item = &'a TopicName>) -> String {
    let joined = topics
        .into_iter()
        .map(TopicName::as_str)
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        NONE.to_string()
    } else {
        joined
    }
}
