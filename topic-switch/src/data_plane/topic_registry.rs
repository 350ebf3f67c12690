//! Per-topic decode state (subjects) and encode state (observers).

use crate::codec::{TopicValueParser, TopicValueSerializer};
use crate::error::{ConsumerKind, SwitchError};
use crate::observability::events;
use crate::primitives::{LazyResource, Lease};
use crate::topic::{RawEvent, TopicName};
use crate::unprocessed::{UnprocessedEvent, UnprocessedSink};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::trace;

const COMPONENT: &str = "topic_registry";

/// Values a consumer stream may fall behind by before it starts skipping.
pub(crate) const SUBJECT_CHANNEL_CAPACITY: usize = 1024;

/// Transport subscription hook run by a cold subject's activation.
pub(crate) type SubscriptionHook = Box<dyn Fn() -> Result<(), SwitchError> + Send + Sync>;

/// Type-erased view of a subject used by the inbound pipeline.
pub(crate) trait TopicSubject: Send + Sync {
    fn kind(&self) -> ConsumerKind;

    /// Decodes the event and multicasts the value. Parse failures go to `sink`.
    fn dispatch(&self, event: RawEvent, sink: &UnprocessedSink);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Subject without a retained value; subscribed on the transport only while attached.
pub(crate) struct ColdSubject<V> {
    parser: TopicValueParser<V>,
    channel: broadcast::Sender<V>,
    activation: LazyResource<broadcast::Sender<V>, SwitchError>,
}

impl<V: Clone + Send + Sync + 'static> ColdSubject<V> {
    pub(crate) fn new(
        parser: TopicValueParser<V>,
        activate: SubscriptionHook,
        deactivate: SubscriptionHook,
    ) -> Self {
        let (channel, _) = broadcast::channel(SUBJECT_CHANNEL_CAPACITY);
        let shared = channel.clone();
        Self {
            parser,
            channel,
            activation: LazyResource::new(move || shared.clone(), activate, deactivate),
        }
    }

    /// Attaches one reader. The returned lease keeps the topic subscribed.
    pub(crate) fn attach(
        &self,
    ) -> Result<(Lease<broadcast::Sender<V>, SwitchError>, broadcast::Receiver<V>), SwitchError>
    {
        let lease = self.activation.attach()?;
        let receiver = lease.resource().subscribe();
        Ok((lease, receiver))
    }

    pub(crate) fn reader_count(&self) -> usize {
        self.activation.active_count()
    }
}

impl<V: Clone + Send + Sync + 'static> TopicSubject for ColdSubject<V> {
    fn kind(&self) -> ConsumerKind {
        ConsumerKind::Cold
    }

    fn dispatch(&self, event: RawEvent, sink: &UnprocessedSink) {
        match (self.parser)(&event.value) {
            Ok(value) => {
                let readers = self.channel.send(value).unwrap_or(0);
                trace!(
                    event = events::INGRESS_DELIVERED,
                    component = COMPONENT,
                    topic = event.topic.as_str(),
                    readers,
                    "cold value delivered"
                );
            }
            Err(cause) => sink.emit(UnprocessedEvent::parse_failure(event, &cause)),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Subject retaining the last decoded value; subscribed for the switch's lifetime.
pub(crate) struct HotSubject<V> {
    parser: TopicValueParser<V>,
    current: Mutex<V>,
    channel: broadcast::Sender<V>,
}

impl<V: Clone + Send + Sync + 'static> HotSubject<V> {
    pub(crate) fn new(parser: TopicValueParser<V>, initial: V) -> Self {
        let (channel, _) = broadcast::channel(SUBJECT_CHANNEL_CAPACITY);
        Self {
            parser,
            current: Mutex::new(initial),
            channel,
        }
    }

    pub(crate) fn current(&self) -> V {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the current value plus a receiver for every later one.
    pub(crate) fn watch(&self) -> (V, broadcast::Receiver<V>) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        (current.clone(), self.channel.subscribe())
    }
}

impl<V: Clone + Send + Sync + 'static> TopicSubject for HotSubject<V> {
    fn kind(&self) -> ConsumerKind {
        ConsumerKind::Hot
    }

    fn dispatch(&self, event: RawEvent, sink: &UnprocessedSink) {
        match (self.parser)(&event.value) {
            Ok(value) => {
                // Update and send under one lock so watch() never misses or repeats a value.
                let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
                *current = value.clone();
                let readers = self.channel.send(value).unwrap_or(0);
                trace!(
                    event = events::INGRESS_DELIVERED,
                    component = COMPONENT,
                    topic = event.topic.as_str(),
                    readers,
                    "hot value delivered"
                );
            }
            Err(cause) => sink.emit(UnprocessedEvent::parse_failure(event, &cause)),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Encoder bound to one topic, shared by every producer handle of that topic.
pub(crate) struct TopicObserver<V> {
    pub(crate) topic: TopicName,
    pub(crate) serializer: TopicValueSerializer<V>,
}

/// Topic to subject/observer maps. At most one of each per topic, never removed.
#[derive(Default)]
pub(crate) struct TopicRegistry {
    subjects: HashMap<TopicName, Arc<dyn TopicSubject>>,
    observers: HashMap<TopicName, Arc<dyn Any + Send + Sync>>,
}

impl TopicRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subject(&self, topic: &TopicName) -> Option<Arc<dyn TopicSubject>> {
        self.subjects.get(topic).cloned()
    }

    /// Looks up an existing subject of the given kind and value type.
    ///
    /// `Ok(None)` means the topic has no subject yet.
    pub(crate) fn typed_subject<S: TopicSubject + 'static>(
        &self,
        topic: &TopicName,
        requested: ConsumerKind,
    ) -> Result<Option<Arc<S>>, SwitchError> {
        let Some(existing) = self.subjects.get(topic) else {
            return Ok(None);
        };
        if existing.kind() != requested {
            return Err(SwitchError::ConsumerKindMismatch {
                topic: topic.to_string(),
                existing: existing.kind(),
                requested,
            });
        }
        existing
            .clone()
            .into_any()
            .downcast::<S>()
            .map(Some)
            .map_err(|_| SwitchError::ValueTypeMismatch {
                topic: topic.to_string(),
            })
    }

    pub(crate) fn insert_subject(&mut self, topic: TopicName, subject: Arc<dyn TopicSubject>) {
        self.subjects.insert(topic, subject);
    }

    pub(crate) fn typed_observer<V: Send + Sync + 'static>(
        &self,
        topic: &TopicName,
    ) -> Result<Option<Arc<TopicObserver<V>>>, SwitchError> {
        let Some(existing) = self.observers.get(topic) else {
            return Ok(None);
        };
        existing
            .clone()
            .downcast::<TopicObserver<V>>()
            .map(Some)
            .map_err(|_| SwitchError::ValueTypeMismatch {
                topic: topic.to_string(),
            })
    }

    pub(crate) fn insert_observer<V: Send + Sync + 'static>(
        &mut self,
        observer: Arc<TopicObserver<V>>,
    ) {
        self.observers.insert(observer.topic.clone(), observer);
    }

    pub(crate) fn consumer_topics(&self) -> Vec<TopicName> {
        let mut topics: Vec<TopicName> = self.subjects.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub(crate) fn producer_topics(&self) -> Vec<TopicName> {
        let mut topics: Vec<TopicName> = self.observers.keys().cloned().collect();
        topics.sort();
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::{ColdSubject, HotSubject, TopicObserver, TopicRegistry, TopicSubject};
    use crate::codec::{self, boxed_parser, boxed_serializer};
    use crate::error::{ConsumerKind, SwitchError};
    use crate::topic::{RawEvent, TopicName};
    use crate::unprocessed::{UnprocessedCode, UnprocessedSink};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn topic(name: &str) -> TopicName {
        TopicName::new(name).unwrap()
    }

    fn collecting_sink() -> (UnprocessedSink, Arc<Mutex<Vec<UnprocessedCode>>>) {
        let codes = Arc::new(Mutex::new(Vec::new()));
        let seen = codes.clone();
        let sink = UnprocessedSink::new(move |unprocessed| {
            seen.lock().unwrap().push(unprocessed.code);
        });
        (sink, codes)
    }

    #[test]
    fn hot_subject_keeps_last_good_value() {
        let subject = HotSubject::new(boxed_parser(codec::from_str::<i32>()), -1);
        let (sink, codes) = collecting_sink();

        subject.dispatch(RawEvent::new(topic("A"), "5"), &sink);
        subject.dispatch(RawEvent::new(topic("A"), "five"), &sink);

        assert_eq!(subject.current(), 5);
        assert_eq!(*codes.lock().unwrap(), vec![UnprocessedCode::ParseFailure]);
    }

    #[test]
    fn cold_subject_activates_per_reader_run() {
        let activations = Arc::new(AtomicUsize::new(0));
        let deactivations = Arc::new(AtomicUsize::new(0));
        let (on, off) = (activations.clone(), deactivations.clone());
        let subject = ColdSubject::new(
            boxed_parser(codec::text()),
            Box::new(move || {
                on.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            Box::new(move || {
                off.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let (first, mut receiver) = subject.attach().unwrap();
        let (second, _) = subject.attach().unwrap();
        assert_eq!(subject.reader_count(), 2);

        let (sink, _) = collecting_sink();
        subject.dispatch(RawEvent::new(topic("C"), "hello"), &sink);
        assert_eq!(receiver.try_recv().unwrap(), "hello");

        drop(first);
        drop(second);
        assert_eq!(activations.load(Ordering::SeqCst), 1);
        assert_eq!(deactivations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_rejects_kind_and_type_mismatches() {
        let mut registry = TopicRegistry::new();
        let hot: Arc<HotSubject<i32>> =
            Arc::new(HotSubject::new(boxed_parser(codec::from_str::<i32>()), 0));
        registry.insert_subject(topic("A"), hot);

        assert!(registry
            .typed_subject::<HotSubject<i32>>(&topic("A"), ConsumerKind::Hot)
            .unwrap()
            .is_some());
        assert!(matches!(
            registry.typed_subject::<HotSubject<String>>(&topic("A"), ConsumerKind::Hot),
            Err(SwitchError::ValueTypeMismatch { .. })
        ));
        assert!(matches!(
            registry.typed_subject::<ColdSubject<i32>>(&topic("A"), ConsumerKind::Cold),
            Err(SwitchError::ConsumerKindMismatch {
                existing: ConsumerKind::Hot,
                requested: ConsumerKind::Cold,
                ..
            })
        ));
    }

    #[test]
    fn registry_observers_are_typed() {
        let mut registry = TopicRegistry::new();
        registry.insert_observer(Arc::new(TopicObserver {
            topic: topic("Out"),
            serializer: boxed_serializer(codec::display::<i32>()),
        }));

        assert!(registry.typed_observer::<i32>(&topic("Out")).unwrap().is_some());
        assert!(registry.typed_observer::<i32>(&topic("Other")).unwrap().is_none());
        assert!(matches!(
            registry.typed_observer::<bool>(&topic("Out")),
            Err(SwitchError::ValueTypeMismatch { .. })
        ));
        assert_eq!(registry.producer_topics(), vec![topic("Out")]);
    }
}
