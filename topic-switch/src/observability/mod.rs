//! Structured logging vocabulary.
//!
//! The crate logs through `tracing` only. Library code emits events and never installs a
//! global subscriber; binaries and tests initialise `tracing_subscriber` themselves.

pub mod events;
pub mod fields;
