//! Small concurrency primitives the switch is built on.
//!
//! [`LazyResource`] shares one activation between many subscribers and is what drives
//! on-demand subscription of cold topics. [`WaitableQueue`] tracks in-flight outbound
//! deliveries so a stopping switch can wait for the drain.

mod lazy_resource;
mod waitable_queue;

pub use lazy_resource::{LazyResource, Lease};
pub use waitable_queue::{QueueTicket, WaitableQueue};
