use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A `metronomeState` message that could not be decoded or failed
    /// range validation.
    #[error("malformed state message: {0}")]
    MalformedStateMessage(String),

    /// The outbound transport refused the message.
    #[error("failed to send intent: {0}")]
    Send(String),

    #[error(transparent)]
    Engine(#[from] beatroom_core::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
