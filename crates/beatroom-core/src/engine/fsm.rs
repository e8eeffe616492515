//! Playback lifecycle state machine.

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Audio resources not yet acquired.
    #[default]
    Uninitialized,
    /// Audio resources acquired, not playing.
    Stopped,
    /// Scheduler running.
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Audio resources acquired (explicit, user-gesture-driven initialize).
    AudioReady,
    Play,
    Stop,
    /// Release everything and return to `Uninitialized`.
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Event was a no-op in the current state.
    None,
    Entered(PlaybackState),
}

/// FSM governing `Uninitialized -> Stopped <-> Playing`.
///
/// Playback cannot begin before audio resources exist, and redundant
/// events (stop while stopped, play while playing) are no-ops so callers
/// can treat stop/shutdown as idempotent.
#[derive(Debug, Default)]
pub struct PlaybackFsm {
    state: PlaybackState,
}

impl PlaybackFsm {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Uninitialized,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state != PlaybackState::Uninitialized
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn transition(&mut self, event: PlaybackEvent) -> Transition {
        use PlaybackEvent::*;

        match event {
            AudioReady => match self.state {
                PlaybackState::Uninitialized => {
                    self.state = PlaybackState::Stopped;
                    Transition::Entered(PlaybackState::Stopped)
                }
                _ => Transition::None,
            },

            Play => match self.state {
                PlaybackState::Stopped => {
                    self.state = PlaybackState::Playing;
                    Transition::Entered(PlaybackState::Playing)
                }
                _ => Transition::None,
            },

            Stop => match self.state {
                PlaybackState::Playing => {
                    self.state = PlaybackState::Stopped;
                    Transition::Entered(PlaybackState::Stopped)
                }
                _ => Transition::None,
            },

            Teardown => match self.state {
                PlaybackState::Uninitialized => Transition::None,
                _ => {
                    self.state = PlaybackState::Uninitialized;
                    Transition::Entered(PlaybackState::Uninitialized)
                }
            },
        }
    }
}
