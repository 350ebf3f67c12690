//! Inbound pipeline: routes raw transport events to the subject of their topic.

use crate::connector::RawEventStream;
use crate::observability::{events, fields};
use crate::topic::RawEvent;
use crate::topic_switch::SwitchCore;
use crate::unprocessed::UnprocessedEvent;
use futures::StreamExt;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, Level};

const COMPONENT: &str = "ingress_dispatcher";

/// Reads the inbound stream of one connection in arrival order.
pub(crate) struct IngressDispatcher {
    core: Weak<SwitchCore>,
}

impl IngressDispatcher {
    pub(crate) fn new(core: &Arc<SwitchCore>) -> Self {
        Self {
            core: Arc::downgrade(core),
        }
    }

    pub(crate) fn spawn(self, inbound: RawEventStream) -> JoinHandle<()> {
        tokio::spawn(self.run(inbound))
    }

    /// Runs until the stream ends or the switch is dropped.
    pub(crate) async fn run(self, mut inbound: RawEventStream) {
        while let Some(event) = inbound.next().await {
            let Some(core) = self.core.upgrade() else {
                return;
            };
            Self::dispatch(&core, event);
        }

        if let Some(core) = self.core.upgrade() {
            info!(
                event = events::INGRESS_STREAM_ENDED,
                component = COMPONENT,
                switch = core.name(),
                reason = fields::REASON_STREAM_CLOSED,
                "inbound stream ended"
            );
        }
    }

    /// Hands one event to its subject. The switch lock is released before parsing.
    pub(crate) fn dispatch(core: &SwitchCore, event: RawEvent) {
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::INGRESS_RECEIVE,
                component = COMPONENT,
                switch = core.name(),
                topic = event.topic.as_str(),
                value = %fields::format_value(&event.value),
                "received inbound event"
            );
        }

        let sink = &core.options().inbound_sink;
        match core.subject(&event.topic) {
            Some(subject) => subject.dispatch(event, sink),
            None => sink.emit(UnprocessedEvent::unexpected(event)),
        }
    }
}
