//! Control-plane layer.
//!
//! Owns subscription bookkeeping for the topics the switch has demand for. The
//! [`SubscriptionLedger`][subscription_ledger::SubscriptionLedger] decides whether a
//! request is applied on the transport or recorded in the deferred backlog, and the
//! [`SubscriptionWorker`][subscription_worker::SubscriptionWorker] applies accepted
//! transitions on the connection in submission order.
//!
//! ```
//! use topic_switch::{codec, InMemoryConnector, SwitchOptions, TopicName, TopicSwitch};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let connector = InMemoryConnector::new();
//! let switch =
//!     TopicSwitch::new("control-plane-doc", connector.clone(), SwitchOptions::default()).unwrap();
//!
//! // Requested while stopped: recorded in the backlog, applied on start.
//! let _hot = switch.create_hot_topic_consumer("H", codec::from_str::<i32>(), 0).unwrap();
//! assert_eq!(switch.deferred_topics(), vec![TopicName::new("H").unwrap()]);
//!
//! switch.start().await.unwrap();
//! assert_eq!(connector.subscribed_topics(), vec![TopicName::new("H").unwrap()]);
//!
//! // Stopping passivates live topics; starting again restores them.
//! switch.stop().await.unwrap();
//! assert!(connector.subscribed_topics().is_empty());
//! switch.start().await.unwrap();
//! assert_eq!(switch.subscribed_topics(), vec![TopicName::new("H").unwrap()]);
//! switch.stop().await.unwrap();
//! # });
//! ```

pub(crate) mod subscription_ledger;
pub(crate) mod subscription_worker;
