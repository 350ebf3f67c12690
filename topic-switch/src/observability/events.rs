//! Canonical structured event names used across `topic-switch`.

// Lifecycle events.
pub const SWITCH_CREATE: &str = "switch_create";
pub const SWITCH_START: &str = "switch_start";
pub const SWITCH_START_OK: &str = "switch_start_ok";
pub const SWITCH_START_FAILED: &str = "switch_start_failed";
pub const SWITCH_START_ABANDONED: &str = "switch_start_abandoned";
pub const SWITCH_STOP: &str = "switch_stop";
pub const SWITCH_STOP_DRAINED: &str = "switch_stop_drained";
pub const SWITCH_STOP_OK: &str = "switch_stop_ok";
pub const CONNECTION_CLOSE_FAILED: &str = "connection_close_failed";

// Subscription bookkeeping events.
pub const SUBSCRIPTION_DEFERRED: &str = "subscription_deferred";
pub const SUBSCRIPTION_DEFERRAL_CANCELLED: &str = "subscription_deferral_cancelled";
pub const SUBSCRIPTION_REPLAY: &str = "subscription_replay";
pub const SUBSCRIPTION_PASSIVATED: &str = "subscription_passivated";
pub const SUBSCRIPTION_TRANSITION_REJECTED: &str = "subscription_transition_rejected";
pub const TRANSPORT_SUBSCRIBE_OK: &str = "transport_subscribe_ok";
pub const TRANSPORT_SUBSCRIBE_FAILED: &str = "transport_subscribe_failed";
pub const TRANSPORT_UNSUBSCRIBE_OK: &str = "transport_unsubscribe_ok";
pub const TRANSPORT_UNSUBSCRIBE_FAILED: &str = "transport_unsubscribe_failed";
pub const TRANSPORT_COMMAND_DROPPED: &str = "transport_command_dropped";
pub const TRANSPORT_WORKER_FAILED: &str = "transport_worker_failed";

// Consumer/producer registry events.
pub const CONSUMER_CREATE: &str = "consumer_create";
pub const CONSUMER_REUSE: &str = "consumer_reuse";
pub const PRODUCER_CREATE: &str = "producer_create";
pub const PRODUCER_REUSE: &str = "producer_reuse";
pub const PRODUCER_DETACHED: &str = "producer_detached";
pub const CONSUMER_LAGGED: &str = "consumer_lagged";
pub const LAZY_DEACTIVATION_FAILED: &str = "lazy_deactivation_failed";

// Inbound pipeline events.
pub const INGRESS_RECEIVE: &str = "ingress_receive";
pub const INGRESS_DELIVERED: &str = "ingress_delivered";
pub const INGRESS_STREAM_ENDED: &str = "ingress_stream_ended";
pub const INGRESS_UNEXPECTED_TOPIC: &str = "ingress_unexpected_topic";
pub const INGRESS_PARSE_FAILED: &str = "ingress_parse_failed";

// Outbound pipeline events.
pub const EGRESS_SERIALIZE_FAILED: &str = "egress_serialize_failed";
pub const EGRESS_REPLAY_BUFFERED: &str = "egress_replay_buffered";
pub const EGRESS_REPLAY_OVERFLOW: &str = "egress_replay_overflow";
pub const EGRESS_WORKER_CREATE: &str = "egress_worker_create";
pub const EGRESS_WORKER_CLOSED: &str = "egress_worker_closed";
pub const EGRESS_SEND_ATTEMPT: &str = "egress_send_attempt";
pub const EGRESS_SEND_OK: &str = "egress_send_ok";
pub const EGRESS_SEND_FAILED: &str = "egress_send_failed";
pub const EGRESS_SUBMIT_REJECTED: &str = "egress_submit_rejected";
pub const EGRESS_POOL_SHUTDOWN: &str = "egress_pool_shutdown";
