//! Glue between the engine and the room's message channel.
//!
//! Local intents are applied optimistically before the message goes out,
//! so the caller sees the change immediately; the next authoritative
//! broadcast is the source of truth and may override it ("server wins").
//! Remote-driven changes never re-emit an outbound intent.

use beatroom_core::{MetronomeEngine, RemoteState, ServerAnchor};

use crate::protocol::{parse_broadcast, ClientIntent, StateBroadcast};
use crate::{Error, Result};

/// Outbound half of the room channel.
///
/// Implementations forward the serialized intent to whatever transport
/// the application uses (a websocket, a test buffer, ...).
pub trait MessageSink {
    fn send(&mut self, payload: &str) -> Result<()>;
}

impl From<&StateBroadcast> for RemoteState {
    fn from(state: &StateBroadcast) -> Self {
        Self {
            is_playing: state.is_playing,
            tempo_bpm: state.tempo,
            beats_per_bar: state.beats,
            anchor: ServerAnchor {
                start_epoch_ms: state.start_time,
                server_epoch_ms: state.server_time,
            },
        }
    }
}

/// Engine plus room channel, speaking the optimistic-update protocol.
pub struct SyncAdapter<S: MessageSink> {
    engine: MetronomeEngine,
    sink: S,
}

impl<S: MessageSink> SyncAdapter<S> {
    pub fn new(engine: MetronomeEngine, sink: S) -> Self {
        Self { engine, sink }
    }

    pub fn engine(&self) -> &MetronomeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MetronomeEngine {
        &mut self.engine
    }

    /// Drive the engine's scheduling pump. Call every 16-25 ms.
    pub fn tick(&mut self) {
        self.engine.tick();
    }

    /// Start playback locally and announce it to the room.
    pub fn start(&mut self) -> Result<()> {
        if self.engine.start()? {
            self.send_intent(ClientIntent::StartMetronome {
                tempo: self.engine.tempo(),
                beats: self.engine.beats_per_bar(),
            })?;
        }
        Ok(())
    }

    /// Stop playback locally and announce it to the room.
    pub fn stop(&mut self) -> Result<()> {
        if self.engine.is_playing() {
            self.engine.stop();
            self.send_intent(ClientIntent::StopMetronome)?;
        }
        Ok(())
    }

    pub fn change_tempo(&mut self, bpm: u16) -> Result<()> {
        self.engine.set_tempo(bpm)?;
        self.send_intent(ClientIntent::ChangeTempo { tempo: bpm })
    }

    pub fn change_beats(&mut self, beats: u32) -> Result<()> {
        self.engine.set_beats_per_bar(beats)?;
        self.send_intent(ClientIntent::ChangeBeats { beats })
    }

    /// Register a tap. When the averaged tempo differs from the current
    /// one it is applied and announced like any other tempo change.
    pub fn tap(&mut self) -> Result<u16> {
        let before = self.engine.tempo();
        let bpm = self.engine.tap();
        if bpm != before {
            self.engine.set_tempo(bpm)?;
            self.send_intent(ClientIntent::ChangeTempo { tempo: bpm })?;
        }
        Ok(bpm)
    }

    pub fn clear_taps(&mut self) {
        self.engine.clear_taps();
    }

    /// Ask the server for a fresh state broadcast (used on join/reconnect).
    pub fn request_sync(&mut self) -> Result<()> {
        self.send_intent(ClientIntent::RequestSync)
    }

    /// Feed an inbound channel message through the adapter.
    ///
    /// Messages for other subsystems are ignored; a malformed
    /// `metronomeState` is logged and dropped rather than surfaced, since
    /// the next broadcast supersedes it anyway.
    pub fn handle_message(&mut self, raw: &str) -> Result<()> {
        let state = match parse_broadcast(raw) {
            Ok(Some(state)) => state,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!("dropping state message: {e}");
                return Ok(());
            }
        };
        self.engine.apply_remote_state(&RemoteState::from(&state))?;
        Ok(())
    }

    fn send_intent(&mut self, intent: ClientIntent) -> Result<()> {
        let payload = serde_json::to_string(&intent)
            .map_err(|e| Error::Send(e.to_string()))?;
        self.sink.send(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use beatroom_core::{AudioOutput, EngineConfig, WallClock};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SilentOutput;

    impl AudioOutput for SilentOutput {
        fn acquire(&mut self) -> beatroom_core::Result<()> {
            Ok(())
        }
        fn resume(&mut self) -> beatroom_core::Result<()> {
            Ok(())
        }
        fn audio_time(&self) -> f64 {
            0.0
        }
        fn schedule_click(&mut self, _at: f64, _accent: bool) -> beatroom_core::Result<()> {
            Ok(())
        }
        fn cancel_pending(&mut self) {}
        fn release(&mut self) {}
    }

    struct FixedClock;

    impl WallClock for FixedClock {
        fn now_ms(&self) -> f64 {
            1_000.0
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl MessageSink for RecordingSink {
        fn send(&mut self, payload: &str) -> Result<()> {
            if self.fail {
                return Err(Error::Send("socket closed".into()));
            }
            self.sent.borrow_mut().push(payload.to_string());
            Ok(())
        }
    }

    fn adapter(sink: RecordingSink) -> SyncAdapter<RecordingSink> {
        let engine = MetronomeEngine::new(
            Box::new(SilentOutput),
            Box::new(FixedClock),
            EngineConfig::default(),
        )
        .unwrap();
        SyncAdapter::new(engine, sink)
    }

    #[test]
    fn test_broadcast_converts_to_remote_state() {
        let state = StateBroadcast {
            is_playing: true,
            tempo: 90,
            beats: 3,
            start_time: 500.0,
            server_time: 900.0,
            room_uuid: None,
        };
        let remote = RemoteState::from(&state);
        assert!(remote.is_playing);
        assert_eq!(remote.tempo_bpm, 90);
        assert_eq!(remote.beats_per_bar, 3);
        assert_relative_eq!(remote.anchor.start_epoch_ms, 500.0);
        assert_relative_eq!(remote.anchor.server_epoch_ms, 900.0);
    }

    #[test]
    fn test_intent_is_serialized_with_action_tag() {
        let sink = RecordingSink::default();
        let sent = Rc::clone(&sink.sent);
        let mut room = adapter(sink);

        room.change_tempo(90).unwrap();
        assert_eq!(
            sent.borrow().as_slice(),
            [r#"{"action":"changeTempo","tempo":90}"#]
        );
    }

    #[test]
    fn test_send_failure_leaves_optimistic_state_applied() {
        let mut room = adapter(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });

        // The local apply happens before the send, so a dead transport
        // surfaces the error but the engine already reflects the intent.
        assert!(matches!(room.change_tempo(96), Err(Error::Send(_))));
        assert_eq!(room.engine().tempo(), 96);

        assert!(matches!(room.start(), Err(Error::Send(_))));
        assert!(room.engine().is_playing());
    }
}
