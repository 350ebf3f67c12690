use std::sync::Once;
use tokio::sync::mpsc;
use topic_switch::{
    InMemoryConnector, SwitchOptions, TopicSwitch, UnprocessedEvent, UnprocessedSink,
};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub(crate) fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub(crate) fn make_switch(
    name: &str,
    options: SwitchOptions,
) -> (InMemoryConnector, TopicSwitch<InMemoryConnector>) {
    init_logging();
    let connector = InMemoryConnector::new();
    let switch = TopicSwitch::new(name, connector.clone(), options)
        .expect("switch creation should succeed");
    (connector, switch)
}

/// Sink forwarding every unprocessed event to the returned receiver.
#[allow(dead_code)]
pub(crate) fn channel_sink() -> (UnprocessedSink, mpsc::UnboundedReceiver<UnprocessedEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let sink = UnprocessedSink::new(move |unprocessed| {
        let _ = sender.send(unprocessed);
    });
    (sink, receiver)
}

#[allow(dead_code)]
pub(crate) fn consumed_values(connector: &InMemoryConnector, topic: &str) -> Vec<String> {
    connector
        .consumed_events()
        .into_iter()
        .filter(|event| event.topic.as_str() == topic)
        .map(|event| event.value)
        .collect()
}
