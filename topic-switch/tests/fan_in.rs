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

use futures::stream::{self, StreamExt};
use support::{consumed_values, make_switch};
use topic_switch::{codec, SwitchOptions};

#[tokio::test(flavor = "multi_thread")]
async fn sum_of_two_hot_topics_is_republished() {
    let (connector, switch) = make_switch("fan-in", SwitchOptions::default());

    let a = switch
        .create_hot_topic_consumer("A", codec::from_str::<i64>(), -1)
        .unwrap();
    let b = switch
        .create_hot_topic_consumer("B", codec::from_str::<i64>(), -1)
        .unwrap();
    let c = switch
        .create_topic_producer("C", codec::display::<i64>())
        .unwrap();
    switch.start().await.unwrap();

    let changes = stream::select(
        a.changes().map(|value| (0usize, value)),
        b.changes().map(|value| (1, value)),
    );
    let combiner = tokio::spawn(async move {
        let mut latest: [Option<i64>; 2] = [None, None];
        futures::pin_mut!(changes);
        while let Some((side, value)) = changes.next().await {
            latest[side] = Some(value);
            if let [Some(a), Some(b)] = latest {
                c.send(a + b);
            }
        }
    });

    connector.wait_for_consumed_events(1).await;
    connector.event("B", "1").unwrap();
    connector.wait_for_consumed_events(2).await;
    connector.event("B", "2").unwrap();
    connector.wait_for_consumed_events(3).await;
    connector.event("A", "1").unwrap();
    connector.wait_for_consumed_events(4).await;

    assert_eq!(consumed_values(&connector, "C"), vec!["-2", "0", "1", "3"]);
    assert_eq!(a.value(), 1);
    assert_eq!(b.value(), 2);

    combiner.abort();
    switch.stop().await.unwrap();
}

#[tokio::test]
async fn consumers_and_producers_are_reused_per_topic() {
    let (_connector, switch) = make_switch("fan-in-reuse", SwitchOptions::default());

    let first = switch
        .create_hot_topic_consumer("A", codec::from_str::<i64>(), -1)
        .unwrap();
    let second = switch
        .create_hot_topic_consumer("A", codec::from_str::<i64>(), 7)
        .unwrap();
    assert_eq!(second.value(), -1);
    assert_eq!(first.topic(), second.topic());

    switch
        .create_topic_producer("C", codec::display::<i64>())
        .unwrap();
    switch
        .create_topic_producer("C", codec::display::<i64>())
        .unwrap();

    assert_eq!(switch.consumer_topics().len(), 1);
    assert_eq!(switch.producer_topics().len(), 1);
}
