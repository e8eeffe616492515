//! Client-side synchronized metronome playback engine.
//!
//! Renders steady, sample-accurate clicks in phase with an authoritative
//! room session. Beats are planned a short window ahead on the audio
//! hardware clock, so the driving tick can be coarse without the clicks
//! drifting or stuttering.
//!
//! # Primary API
//!
//! - [`MetronomeEngine`]: lifecycle, tempo/bar control, tap tempo, and
//!   reconciliation against [`RemoteState`] broadcasts
//! - [`AudioOutput`]: audio clock + exact-time click scheduling seam
//! - [`CpalOutput`]: the hardware implementation (feature `cpal-output`,
//!   on by default)
//! - [`EngineObserver`]: beat/tempo/state change callbacks
//!
//! # Example
//!
//! ```ignore
//! use beatroom_core::{CpalOutput, EngineConfig, MetronomeEngine, SystemClock};
//!
//! let mut engine = MetronomeEngine::new(
//!     Box::new(CpalOutput::new()),
//!     Box::new(SystemClock),
//!     EngineConfig::default(),
//! )?;
//! engine.initialize()?;
//! engine.start()?;
//! loop {
//!     engine.tick();
//!     std::thread::sleep(std::time::Duration::from_millis(20));
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{EngineConfig, BEATS_MAX, BEATS_MIN, TEMPO_MAX, TEMPO_MIN};

pub mod clock;
pub use clock::{ServerAnchor, SystemClock, TranslatedAnchor, WallClock};

pub(crate) mod observer;
pub use observer::EngineObserver;

pub mod engine;
pub use engine::fsm::PlaybackState;
pub use engine::scheduler::ScheduledBeat;
pub use engine::{MetronomeEngine, RemoteState};

pub mod output;
#[cfg(feature = "cpal-output")]
pub use output::CpalOutput;
pub use output::{AudioOutput, ClickSounds};

pub mod tap;
pub use tap::TapTempo;
