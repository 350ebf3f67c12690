//! Egress worker pool: one sequential worker per topic, bounded concurrency across topics.

use crate::connector::DeliverFn;
use crate::data_plane::egress_worker::{Delivery, EgressContext, EgressTopicWorker};
use crate::observability::events;
use crate::primitives::WaitableQueue;
use crate::topic::{RawEvent, TopicName};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const COMPONENT: &str = "egress_pool";

/// Outbound pipeline of one started switch.
///
/// Every submitted event is tracked in the in-flight queue until its delivery attempt
/// completes, whatever the outcome.
pub(crate) struct EgressPool {
    runtime: Handle,
    context: EgressContext,
    workers: HashMap<TopicName, EgressTopicWorker>,
}

impl EgressPool {
    /// Must be called from within a tokio runtime; workers are spawned on it.
    pub(crate) fn new(
        switch_name: Arc<str>,
        deliver: DeliverFn,
        concurrency: usize,
        in_flight: Arc<WaitableQueue>,
    ) -> Self {
        Self {
            runtime: Handle::current(),
            context: EgressContext {
                switch_name,
                deliver,
                permits: Arc::new(Semaphore::new(concurrency)),
                in_flight,
            },
            workers: HashMap::new(),
        }
    }

    /// Queues one event behind earlier events of the same topic. Never blocks.
    pub(crate) fn submit(&mut self, event: RawEvent) {
        let ticket = self.context.in_flight.add();
        let worker = self
            .workers
            .entry(event.topic.clone())
            .or_insert_with_key(|topic| {
                EgressTopicWorker::spawn(&self.runtime, topic.clone(), self.context.clone())
            });

        if let Err(rejected) = worker.submit(Delivery { event, ticket }) {
            warn!(
                event = events::EGRESS_SUBMIT_REJECTED,
                component = COMPONENT,
                switch = &*self.context.switch_name,
                topic = rejected.event.topic.as_str(),
                "egress worker is gone; dropping event"
            );
            self.context.in_flight.remove(rejected.ticket);
        }
    }

    #[cfg(test)]
    pub(crate) fn topic_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes every worker after it delivered what was queued.
    pub(crate) async fn shutdown(self) {
        debug!(
            event = events::EGRESS_POOL_SHUTDOWN,
            component = COMPONENT,
            switch = &*self.context.switch_name,
            workers = self.workers.len(),
            in_flight = self.context.in_flight.len(),
            "closing egress workers"
        );
        for (_, worker) in self.workers {
            worker.close().await;
        }
    }
}
