//! Subscription bookkeeping: live topics, deferred backlog and their transitions.

use crate::error::SwitchError;
use crate::topic::TopicName;
use std::collections::{BTreeSet, VecDeque};

/// Outcome of a subscribe request accepted by the ledger.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SubscribeTransition {
    /// Connected: the transport subscription must be issued now.
    Apply,
    /// Disconnected: recorded in the backlog for the next connect.
    Deferred,
}

/// Outcome of an unsubscribe request accepted by the ledger.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum UnsubscribeTransition {
    /// Connected: the transport unsubscription must be issued now.
    Apply,
    /// Disconnected: the pending backlog entry was dropped.
    DeferralCancelled,
}

/// Which topics are live on the transport and which wait for the next connect.
///
/// A topic is never both subscribed and deferred. Invalid transitions are rejected
/// rather than ignored.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionLedger {
    connected: bool,
    subscribed: BTreeSet<TopicName>,
    deferred: VecDeque<TopicName>,
}

impl SubscriptionLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn request_subscribe(
        &mut self,
        topic: &TopicName,
    ) -> Result<SubscribeTransition, SwitchError> {
        if self.subscribed.contains(topic) {
            return Err(SwitchError::AlreadySubscribed(topic.to_string()));
        }
        if self.deferred.contains(topic) {
            return Err(SwitchError::AlreadyDeferred(topic.to_string()));
        }

        if self.connected {
            self.subscribed.insert(topic.clone());
            Ok(SubscribeTransition::Apply)
        } else {
            // Fresh demand replays ahead of passivated topics.
            self.deferred.push_front(topic.clone());
            Ok(SubscribeTransition::Deferred)
        }
    }

    pub(crate) fn request_unsubscribe(
        &mut self,
        topic: &TopicName,
    ) -> Result<UnsubscribeTransition, SwitchError> {
        if self.connected {
            if !self.subscribed.remove(topic) {
                return Err(SwitchError::NotSubscribed(topic.to_string()));
            }
            return Ok(UnsubscribeTransition::Apply);
        }

        let Some(position) = self.deferred.iter().position(|pending| pending == topic) else {
            return Err(SwitchError::NotSubscribed(topic.to_string()));
        };
        self.deferred.remove(position);
        Ok(UnsubscribeTransition::DeferralCancelled)
    }

    /// Marks the transport connected and drains the backlog in replay order.
    ///
    /// Returns the topics to subscribe on the transport, each exactly once.
    pub(crate) fn connect(&mut self) -> Vec<TopicName> {
        self.connected = true;
        let mut replay = Vec::with_capacity(self.deferred.len());
        while let Some(topic) = self.deferred.pop_front() {
            if self.subscribed.insert(topic.clone()) {
                replay.push(topic);
            }
        }
        replay
    }

    /// Moves every live topic to the backlog and marks the transport disconnected.
    ///
    /// Returns the topics to unsubscribe on the transport.
    pub(crate) fn passivate(&mut self) -> Vec<TopicName> {
        let subscribed = std::mem::take(&mut self.subscribed);
        let passivated: Vec<TopicName> = subscribed
            .into_iter()
            .filter(|topic| !self.deferred.contains(topic))
            .collect();
        self.deferred.extend(passivated.iter().cloned());
        self.connected = false;
        passivated
    }

    pub(crate) fn subscribed(&self) -> Vec<TopicName> {
        self.subscribed.iter().cloned().collect()
    }

    pub(crate) fn deferred(&self) -> Vec<TopicName> {
        self.deferred.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{SubscribeTransition, SubscriptionLedger, UnsubscribeTransition};
    use crate::error::SwitchError;
    use crate::topic::TopicName;

    fn topic(name: &str) -> TopicName {
        TopicName::new(name).unwrap()
    }

    #[test]
    fn disconnected_requests_go_to_backlog() {
        let mut ledger = SubscriptionLedger::new();

        assert_eq!(
            ledger.request_subscribe(&topic("A")).unwrap(),
            SubscribeTransition::Deferred
        );
        assert_eq!(
            ledger.request_subscribe(&topic("B")).unwrap(),
            SubscribeTransition::Deferred
        );
        assert_eq!(ledger.deferred(), vec![topic("B"), topic("A")]);
        assert!(ledger.subscribed().is_empty());

        assert_eq!(
            ledger.request_unsubscribe(&topic("A")).unwrap(),
            UnsubscribeTransition::DeferralCancelled
        );
        assert_eq!(ledger.deferred(), vec![topic("B")]);
    }

    #[test]
    fn invalid_transitions_fail_fast() {
        let mut ledger = SubscriptionLedger::new();
        ledger.request_subscribe(&topic("A")).unwrap();
        assert!(matches!(
            ledger.request_subscribe(&topic("A")),
            Err(SwitchError::AlreadyDeferred(_))
        ));
        assert!(matches!(
            ledger.request_unsubscribe(&topic("Z")),
            Err(SwitchError::NotSubscribed(_))
        ));

        ledger.connect();
        assert!(matches!(
            ledger.request_subscribe(&topic("A")),
            Err(SwitchError::AlreadySubscribed(_))
        ));
        assert_eq!(
            ledger.request_unsubscribe(&topic("A")).unwrap(),
            UnsubscribeTransition::Apply
        );
        assert!(matches!(
            ledger.request_unsubscribe(&topic("A")),
            Err(SwitchError::NotSubscribed(_))
        ));
    }

    #[test]
    fn passivate_then_connect_restores_subscriptions() {
        let mut ledger = SubscriptionLedger::new();
        ledger.connect();
        ledger.request_subscribe(&topic("H")).unwrap();
        ledger.request_subscribe(&topic("K")).unwrap();

        let passivated = ledger.passivate();
        assert_eq!(passivated, vec![topic("H"), topic("K")]);
        assert!(!ledger.is_connected());
        assert!(ledger.subscribed().is_empty());
        assert_eq!(ledger.deferred(), vec![topic("H"), topic("K")]);

        let replayed = ledger.connect();
        assert_eq!(replayed, vec![topic("H"), topic("K")]);
        assert_eq!(ledger.subscribed(), vec![topic("H"), topic("K")]);
        assert!(ledger.deferred().is_empty());
    }

    #[test]
    fn connect_never_replays_a_topic_twice() {
        let mut ledger = SubscriptionLedger::new();
        ledger.request_subscribe(&topic("A")).unwrap();
        ledger.connect();
        ledger.passivate();
        ledger.request_subscribe(&topic("B")).unwrap();

        let replayed = ledger.connect();

        assert_eq!(replayed, vec![topic("B"), topic("A")]);
        assert_eq!(ledger.subscribed().len(), 2);
    }
}
