//! # Beatroom - Synchronized Metronome Playback
//!
//! Umbrella crate coordinating:
//! - **beatroom-core** - the playback engine (lookahead scheduler, audio
//!   output, playback state machine, tap tempo, drift reconciliation)
//! - **beatroom-sync** - the room protocol (outbound intents, inbound
//!   state broadcasts, optimistic-update adapter)
//!
//! ## Quick Start
//!
//! ```ignore
//! use beatroom::prelude::*;
//!
//! let engine = MetronomeEngine::new(
//!     Box::new(CpalOutput::new()),
//!     Box::new(SystemClock),
//!     EngineConfig::default(),
//! )?;
//! let mut room = SyncAdapter::new(engine, my_socket);
//!
//! room.engine_mut().initialize()?;
//! room.start()?;
//! loop {
//!     room.tick();
//!     std::thread::sleep(std::time::Duration::from_millis(20));
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `cpal-output` (default) - hardware audio output via CPAL

/// Re-export of beatroom-core for direct access
pub use beatroom_core as core;

/// Re-export of beatroom-sync for direct access
pub use beatroom_sync as sync;

pub use beatroom_core::{
    AudioOutput, ClickSounds, EngineConfig, EngineObserver, Error, MetronomeEngine,
    PlaybackState, RemoteState, Result, ScheduledBeat, ServerAnchor, SystemClock, TapTempo,
    WallClock,
};

#[cfg(feature = "cpal-output")]
pub use beatroom_core::CpalOutput;

pub use beatroom_sync::{ClientIntent, MessageSink, StateBroadcast, SyncAdapter};

/// Common imports for applications embedding the metronome.
pub mod prelude {
    pub use beatroom_core::{
        AudioOutput, EngineConfig, EngineObserver, MetronomeEngine, PlaybackState, RemoteState,
        SystemClock,
    };

    #[cfg(feature = "cpal-output")]
    pub use beatroom_core::CpalOutput;

    pub use beatroom_sync::{MessageSink, SyncAdapter};
}
