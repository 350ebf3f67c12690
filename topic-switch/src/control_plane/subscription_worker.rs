//! Ordered executor for transport (un)subscriptions of one connection.

use crate::connector::Connector;
use crate::observability::events;
use crate::topic::TopicName;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const COMPONENT: &str = "subscription_worker";

#[derive(Debug)]
pub(crate) enum SubscriptionCommand {
    Subscribe(TopicName),
    Unsubscribe(TopicName),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Cloneable, non-blocking handle used to queue commands, also under the switch lock.
#[derive(Clone, Debug)]
pub(crate) struct SubscriptionQueue {
    commands: mpsc::UnboundedSender<SubscriptionCommand>,
}

impl SubscriptionQueue {
    pub(crate) fn subscribe(&self, topic: TopicName) {
        self.submit(SubscriptionCommand::Subscribe(topic));
    }

    pub(crate) fn unsubscribe(&self, topic: TopicName) {
        self.submit(SubscriptionCommand::Unsubscribe(topic));
    }

    /// Resolves once every command queued before it went through the connector.
    pub(crate) async fn flush(&self) {
        let (done, flushed) = oneshot::channel();
        if self.commands.send(SubscriptionCommand::Flush(done)).is_ok() {
            let _ = flushed.await;
        }
    }

    fn submit(&self, command: SubscriptionCommand) {
        if let Err(rejected) = self.commands.send(command) {
            warn!(
                event = events::TRANSPORT_COMMAND_DROPPED,
                component = COMPONENT,
                command = ?rejected.0,
                "subscription worker is gone; dropping command"
            );
        }
    }
}

/// Task applying [`SubscriptionCommand`]s in submission order.
///
/// Failures are logged and never retried; callers observe bookkeeping only.
pub(crate) struct SubscriptionWorker {
    queue: SubscriptionQueue,
    task: JoinHandle<()>,
}

impl SubscriptionWorker {
    pub(crate) fn spawn<C: Connector>(
        switch_name: Arc<str>,
        connector: Arc<C>,
        connection: Arc<C::Connection>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self::command_loop(
            switch_name,
            connector,
            connection,
            receiver,
        ));

        Self {
            queue: SubscriptionQueue { commands },
            task,
        }
    }

    pub(crate) fn queue(&self) -> SubscriptionQueue {
        self.queue.clone()
    }

    /// Runs the commands queued so far, then stops the task.
    ///
    /// Commands queued afterwards through a surviving [`SubscriptionQueue`] are dropped.
    pub(crate) async fn shutdown(self) {
        self.queue.submit(SubscriptionCommand::Shutdown);
        if let Err(err) = self.task.await {
            warn!(
                event = events::TRANSPORT_WORKER_FAILED,
                component = COMPONENT,
                err = %err,
                "subscription worker ended abnormally"
            );
        }
    }

    pub(crate) async fn command_loop<C: Connector>(
        switch_name: Arc<str>,
        connector: Arc<C>,
        connection: Arc<C::Connection>,
        mut receiver: mpsc::UnboundedReceiver<SubscriptionCommand>,
    ) {
        let switch = &*switch_name;
        while let Some(command) = receiver.recv().await {
            match command {
                SubscriptionCommand::Subscribe(topic) => {
                    match connector.subscribe(&connection, &topic).await {
                        Ok(()) => debug!(
                            event = events::TRANSPORT_SUBSCRIBE_OK,
                            component = COMPONENT,
                            switch,
                            topic = topic.as_str(),
                            "topic subscribed"
                        ),
                        Err(err) => warn!(
                            event = events::TRANSPORT_SUBSCRIBE_FAILED,
                            component = COMPONENT,
                            switch,
                            topic = topic.as_str(),
                            err = %err,
                            "topic subscription failed"
                        ),
                    }
                }
                SubscriptionCommand::Unsubscribe(topic) => {
                    match connector.unsubscribe(&connection, &topic).await {
                        Ok(()) => debug!(
                            event = events::TRANSPORT_UNSUBSCRIBE_OK,
                            component = COMPONENT,
                            switch,
                            topic = topic.as_str(),
                            "topic unsubscribed"
                        ),
                        Err(err) => warn!(
                            event = events::TRANSPORT_UNSUBSCRIBE_FAILED,
                            component = COMPONENT,
                            switch,
                            topic = topic.as_str(),
                            err = %err,
                            "topic unsubscription failed"
                        ),
                    }
                }
                SubscriptionCommand::Flush(done) => {
                    let _ = done.send(());
                }
                SubscriptionCommand::Shutdown => break,
            }
        }
    }
}
