//! Error types for beatroom-core.

use thiserror::Error;

/// Error type for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid tempo: {0}. Must be between 40 and 240 BPM")]
    InvalidTempo(u16),

    #[error("Invalid beats per bar: {0}. Must be between 2 and 8")]
    InvalidBeats(u32),

    #[error("No audio output available on this platform")]
    UnsupportedPlatform,

    #[error("Audio resource error: {0}")]
    AudioResource(String),

    #[error("Click asset load failed: {0}")]
    AssetLoad(String),

    #[error("Audio output not initialized")]
    NotReady,

    #[cfg(feature = "cpal-output")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to pause audio stream")]
    PauseStream(#[from] cpal::PauseStreamError),
}

impl Error {
    /// Whether initialization may be retried after this error.
    ///
    /// `UnsupportedPlatform` is permanent; resource errors are transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::UnsupportedPlatform | Error::AssetLoad(_))
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
