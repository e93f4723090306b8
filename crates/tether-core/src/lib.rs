//! tether-core: Message model and streaming assembly primitives
//!
//! This crate defines the UI-facing message model, the agent session event
//! wire types, and the per-turn `StreamingBuffer` that rebuilds content
//! blocks while a turn is still in flight.

pub mod buffer;
pub mod error;
pub mod stream;
pub mod types;

pub use buffer::{StreamingBuffer, ToolMeta};
pub use error::{Error, Result};
pub use stream::{ContentBlock, Delta, SessionEvent, SessionEventStream, parse_event_log};
pub use types::*;

/// Current wall-clock time in milliseconds, the unit of every timestamp here
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
