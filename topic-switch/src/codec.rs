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

//! Ready-made topic value parsers and serializers.
//!
//! Topics carry plain strings. Device controllers commonly publish integers as decimal
//! text and switches as `"0"`/`"1"`; richer payloads travel as JSON.
//!
//! ```
//! use topic_switch::codec;
//!
//! let parse = codec::from_str::<i64>();
//! assert_eq!(parse("42").unwrap(), 42);
//! assert!(parse("forty-two").is_err());
//!
//! let serialize = codec::switch_serializer();
//! assert_eq!(serialize(&true).unwrap(), "1");
//! ```

use crate::error::BoxError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// Decodes a raw topic value.
pub type TopicValueParser<V> = Arc<dyn Fn(&str) -> Result<V, BoxError> + Send + Sync>;

/// Encodes a value for a topic.
pub type TopicValueSerializer<V> = Arc<dyn Fn(&V) -> Result<String, BoxError> + Send + Sync>;

pub(crate) fn boxed_parser<V, E, P>(parser: P) -> TopicValueParser<V>
where
    V: 'static,
    P: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    Arc::new(move |value: &str| parser(value).map_err(Into::into))
}

pub(crate) fn boxed_serializer<V, E, S>(serializer: S) -> TopicValueSerializer<V>
where
    V: 'static,
    S: Fn(&V) -> Result<String, E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    Arc::new(move |value: &V| serializer(value).map_err(Into::into))
}

/// Keeps the raw value as is.
pub fn text() -> impl Fn(&str) -> Result<String, BoxError> + Send + Sync + Clone + 'static {
    |value: &str| Ok(value.to_string())
}

/// Parses the (whitespace trimmed) value with [`FromStr`].
pub fn from_str<T>() -> impl Fn(&str) -> Result<T, BoxError> + Send + Sync + Clone + 'static
where
    T: FromStr + 'static,
    T::Err: Into<BoxError>,
{
    |value: &str| value.trim().parse::<T>().map_err(Into::into)
}

/// Renders the value with [`Display`].
pub fn display<T: Display + 'static>(
) -> impl Fn(&T) -> Result<String, BoxError> + Send + Sync + Clone + 'static {
    |value: &T| Ok(value.to_string())
}

/// Parses a switch state: `1`/`0` or `true`/`false`.
pub fn switch() -> impl Fn(&str) -> Result<bool, BoxError> + Send + Sync + Clone + 'static {
    |value: &str| match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(format!("{other:?} is not a switch state").into()),
    }
}

/// Encodes a switch state as `1`/`0`.
pub fn switch_serializer(
) -> impl Fn(&bool) -> Result<String, BoxError> + Send + Sync + Clone + 'static {
    |value: &bool| Ok(if *value { "1" } else { "0" }.to_string())
}

/// Decodes a JSON document.
pub fn json<T: DeserializeOwned + 'static>(
) -> impl Fn(&str) -> Result<T, BoxError> + Send + Sync + Clone + 'static {
    |value: &str| serde_json::from_str(value).map_err(Into::into)
}

/// Encodes a value as a JSON document.
pub fn to_json<T: Serialize + 'static>(
) -> impl Fn(&T) -> Result<String, BoxError> + Send + Sync + Clone + 'static {
    |value: &T| serde_json::to_string(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::{display, from_str, json, switch, switch_serializer, text, to_json};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Reading {
        channel: u8,
        celsius: f32,
    }

    #[test]
    fn from_str_trims_and_reports_failures() {
        let parse = from_str::<i32>();
        assert_eq!(parse(" 17\n").unwrap(), 17);

        let err = parse("17.5").expect_err("not an integer");
        assert!(err.to_string().contains("invalid digit"));
    }

    #[test]
    fn switch_accepts_both_encodings() {
        let parse = switch();
        assert!(parse("1").unwrap());
        assert!(parse("true").unwrap());
        assert!(!parse("0").unwrap());
        assert!(!parse("false").unwrap());
        assert!(parse("on").is_err());

        let serialize = switch_serializer();
        assert_eq!(serialize(&false).unwrap(), "0");
    }

    #[test]
    fn json_codec_handles_structs() {
        let reading = Reading {
            channel: 3,
            celsius: 21.5,
        };
        let encoded = to_json::<Reading>()(&reading).unwrap();
        let decoded = json::<Reading>()(&encoded).unwrap();

        assert_eq!(decoded, reading);
        assert!(json::<Reading>()("{}").is_err());
    }

    #[test]
    fn text_and_display_are_lossless() {
        assert_eq!(text()("raw value").unwrap(), "raw value");
        assert_eq!(display::<f64>()(&1.5).unwrap(), "1.5");
    }
}
