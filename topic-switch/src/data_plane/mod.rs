//! Data-plane layer.
//!
//! Owns the per-topic decode/encode state and both event pipelines. The inbound side
//! reads the connection's raw-event stream in arrival order and hands every event to
//! the subject of its topic. The outbound side runs one sequential worker per topic
//! and shares a concurrency budget across topics.
//!
//! ```
//! use futures::StreamExt;
//! use topic_switch::{codec, InMemoryConnector, SwitchOptions, TopicSwitch};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let connector = InMemoryConnector::new();
//! let switch =
//!     TopicSwitch::new("data-plane-doc", connector.clone(), SwitchOptions::default()).unwrap();
//! switch.start().await.unwrap();
//!
//! let level = switch
//!     .create_hot_topic_consumer("level", codec::from_str::<u8>(), 0)
//!     .unwrap();
//! let out = switch
//!     .create_topic_producer("level/echo", codec::display::<u8>())
//!     .unwrap();
//!
//! let mut changes = level.changes();
//! assert_eq!(changes.next().await, Some(0));
//!
//! // The malformed value goes to the inbound sink; the next one still arrives.
//! connector.event("level", "not a number").unwrap();
//! connector.event("level", "42").unwrap();
//! assert_eq!(changes.next().await, Some(42));
//! assert_eq!(level.value(), 42);
//!
//! out.send(level.value());
//! switch.stop().await.unwrap();
//! assert_eq!(connector.consumed_events()[0].value, "42");
//! # });
//! ```

pub(crate) mod egress_pool;
pub(crate) mod egress_worker;
pub(crate) mod ingress_dispatcher;
pub(crate) mod topic_registry;
