//! Room synchronization for the metronome engine.
//!
//! Speaks the room channel's JSON protocol: outbound [`ClientIntent`]
//! messages for local actions, the inbound `metronomeState` broadcast for
//! the authoritative room state. [`SyncAdapter`] wires a
//! [`MetronomeEngine`](beatroom_core::MetronomeEngine) to a
//! [`MessageSink`] and applies the optimistic-update discipline.

pub mod error;
pub use error::{Error, Result};

pub mod protocol;
pub use protocol::{parse_broadcast, ClientIntent, StateBroadcast};

pub mod adapter;
pub use adapter::{MessageSink, SyncAdapter};
