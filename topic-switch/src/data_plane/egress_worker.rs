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

//! Per-topic egress worker that hands queued events to the connector's deliver function.

use crate::connector::DeliverFn;
use crate::observability::{events, fields};
use crate::primitives::{QueueTicket, WaitableQueue};
use crate::topic::{RawEvent, TopicName};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "egress_worker";

/// Shared by every worker of one egress pool.
#[derive(Clone)]
pub(crate) struct EgressContext {
    pub(crate) switch_name: Arc<str>,
    pub(crate) deliver: DeliverFn,
    pub(crate) permits: Arc<Semaphore>,
    pub(crate) in_flight: Arc<WaitableQueue>,
}

/// One outbound write together with its in-flight ticket.
pub(crate) struct Delivery {
    pub(crate) event: RawEvent,
    pub(crate) ticket: QueueTicket,
}

/// Worker task owning the sequential delivery loop of one topic.
pub(crate) struct EgressTopicWorker {
    sender: mpsc::UnboundedSender<Delivery>,
    task: JoinHandle<()>,
}

impl EgressTopicWorker {
    pub(crate) fn spawn(runtime: &Handle, topic: TopicName, context: EgressContext) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        debug!(
            event = events::EGRESS_WORKER_CREATE,
            component = COMPONENT,
            switch = &*context.switch_name,
            topic = topic.as_str(),
            "spawning egress worker"
        );
        let task = runtime.spawn(Self::delivery_loop(topic, context, receiver));
        Self { sender, task }
    }

    /// Queues a delivery. Hands it back when the loop already ended.
    pub(crate) fn submit(&self, delivery: Delivery) -> Result<(), Delivery> {
        self.sender.send(delivery).map_err(|rejected| rejected.0)
    }

    /// Lets the loop deliver what is queued, then waits for it to end.
    pub(crate) async fn close(self) {
        let Self { sender, task } = self;
        drop(sender);
        if let Err(err) = task.await {
            warn!(
                event = events::EGRESS_WORKER_CLOSED,
                component = COMPONENT,
                err = %err,
                "egress worker ended abnormally"
            );
        }
    }

    /// Delivers events one at a time, each under a permit of the shared budget.
    pub(crate) async fn delivery_loop(
        topic: TopicName,
        context: EgressContext,
        mut receiver: mpsc::UnboundedReceiver<Delivery>,
    ) {
        let switch = &*context.switch_name;

        while let Some(Delivery { event, ticket }) = receiver.recv().await {
            let permit = context.permits.acquire().await;
            let value = tracing::enabled!(Level::DEBUG).then(|| fields::format_value(&event.value));

            if let Some(value) = value.as_deref() {
                debug!(
                    event = events::EGRESS_SEND_ATTEMPT,
                    component = COMPONENT,
                    switch,
                    topic = topic.as_str(),
                    value,
                    in_flight = context.in_flight.len(),
                    "attempting egress send"
                );
            }

            match (context.deliver)(event.clone()).await {
                Ok(()) => {
                    if let Some(value) = value.as_deref() {
                        debug!(
                            event = events::EGRESS_SEND_OK,
                            component = COMPONENT,
                            switch,
                            topic = topic.as_str(),
                            value,
                            "egress send succeeded"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        event = events::EGRESS_SEND_FAILED,
                        component = COMPONENT,
                        switch,
                        topic = topic.as_str(),
                        value = %fields::format_value(&event.value),
                        err = %err,
                        "egress send failed"
                    );
                }
            }

            drop(permit);
            context.in_flight.remove(ticket);
        }

        info!(
            event = events::EGRESS_WORKER_CLOSED,
            component = COMPONENT,
            switch,
            topic = topic.as_str(),
            reason = fields::REASON_PIPELINE_DETACHED,
            "queue closed; stopping delivery loop"
        );
    }
}
