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

mod support;

use std::time::Duration;
use support::{channel_sink, consumed_values, make_switch};
use topic_switch::{codec, BoxError, SwitchOptions, UnprocessedCode, UNDEFINED_VALUE};

fn numbers(range: std::ops::Range<u32>) -> Vec<String> {
    range.map(|value| value.to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writes_keep_per_topic_order_under_concurrency() {
    let (connector, switch) = make_switch(
        "ordering",
        SwitchOptions::default().with_outbound_concurrency(2),
    );
    connector.set_delivery_delay(Duration::from_millis(2));
    switch.start().await.unwrap();

    let producers: Vec<_> = ["x", "y", "z"]
        .into_iter()
        .map(|topic| {
            switch
                .create_topic_producer(topic, codec::display::<u32>())
                .unwrap()
        })
        .collect();
    for value in 0..10 {
        for producer in &producers {
            producer.send(value);
        }
    }
    switch.wait_pending_events().await;

    for topic in ["x", "y", "z"] {
        assert_eq!(consumed_values(&connector, topic), numbers(0..10));
    }
    assert_eq!(switch.in_flight(), 0);
    switch.stop().await.unwrap();
}

#[tokio::test]
async fn stop_waits_for_queued_writes() {
    let (connector, switch) = make_switch("drain", SwitchOptions::default());
    connector.set_delivery_delay(Duration::from_millis(20));
    switch.start().await.unwrap();

    let producer = switch
        .create_topic_producer("slow", codec::display::<u32>())
        .unwrap();
    for value in 0..5 {
        producer.send(value);
    }
    switch.stop().await.unwrap();

    assert_eq!(consumed_values(&connector, "slow"), numbers(0..5));
    assert_eq!(switch.in_flight(), 0);
    assert!(!connector.is_open());
}

#[tokio::test]
async fn writes_while_stopped_are_replayed_on_start() {
    let (connector, switch) = make_switch(
        "replay",
        SwitchOptions::default().with_replay_buffer_size(3),
    );
    let producer = switch
        .create_topic_producer("queued", codec::display::<u32>())
        .unwrap();

    for value in 0..5 {
        producer.send(value);
    }
    assert!(connector.consumed_events().is_empty());

    switch.start().await.unwrap();
    switch.wait_pending_events().await;
    assert_eq!(consumed_values(&connector, "queued"), numbers(2..5));

    switch.stop().await.unwrap();
    producer.send(5);
    tokio::task::yield_now().await;
    assert_eq!(consumed_values(&connector, "queued"), numbers(2..5));
    assert_eq!(switch.in_flight(), 0);

    switch.start().await.unwrap();
    switch.wait_pending_events().await;
    assert_eq!(consumed_values(&connector, "queued"), numbers(2..6));
    switch.stop().await.unwrap();
}

#[tokio::test]
async fn forward_sends_every_stream_item() {
    let (connector, switch) = make_switch("forward", SwitchOptions::default());
    switch.start().await.unwrap();

    let producer = switch
        .create_topic_producer("series", codec::display::<u32>())
        .unwrap();
    producer.forward(futures::stream::iter(0..4)).await;
    switch.wait_pending_events().await;

    assert_eq!(consumed_values(&connector, "series"), numbers(0..4));
    switch.stop().await.unwrap();
}

#[tokio::test]
async fn serializer_failures_go_to_the_outbound_sink() {
    let (outbound, mut unprocessed) = channel_sink();
    let (inbound, _) = channel_sink();
    let (connector, switch) = make_switch(
        "serialize-failure",
        SwitchOptions::default()
            .with_inbound_sink(inbound)
            .with_outbound_sink(outbound),
    );
    switch.start().await.unwrap();

    let producer = switch
        .create_topic_producer("positive", |value: &i32| {
            if *value < 0 {
                Err(BoxError::from(format!("{value} is negative")))
            } else {
                Ok(value.to_string())
            }
        })
        .unwrap();
    producer.send(-3);
    producer.send(3);
    switch.wait_pending_events().await;

    let failure = unprocessed.recv().await.unwrap();
    assert_eq!(failure.code, UnprocessedCode::SerializeFailure);
    assert_eq!(failure.event.topic.as_str(), "positive");
    assert_eq!(failure.event.value, UNDEFINED_VALUE);
    assert!(failure.reason.contains("-3"));
    assert_eq!(consumed_values(&connector, "positive"), vec!["3"]);

    switch.stop().await.unwrap();
}

#[tokio::test]
async fn producers_outliving_the_switch_drop_values() {
    let (connector, switch) = make_switch("detached", SwitchOptions::default());
    let producer = switch
        .create_topic_producer("late", codec::display::<u32>())
        .unwrap();
    drop(switch);

    producer.send(1);
    assert!(connector.consumed_events().is_empty());
}
