//! The metronome engine: playback lifecycle, scheduling and
//! reconciliation against the authoritative room state.
//!
//! One engine instance exists per room session and is owned by a single
//! logical thread. Handlers leave state fully consistent before
//! returning; the only cross-thread edge is inside the audio output.

pub mod fsm;
pub mod reconcile;
pub mod scheduler;

use std::time::Duration;

use crate::clock::{ServerAnchor, WallClock};
use crate::config::{EngineConfig, BEATS_MAX, BEATS_MIN, TEMPO_MAX, TEMPO_MIN};
use crate::observer::{EngineObserver, Observers};
use crate::output::AudioOutput;
use crate::tap::TapTempo;
use crate::{Error, Result};

use fsm::{PlaybackEvent, PlaybackFsm, PlaybackState, Transition};
use reconcile::{Correction, DriftPolicy};
use scheduler::BeatScheduler;

/// Authoritative room state, as seen by the engine.
///
/// Produced by the sync adapter from a `metronomeState` broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteState {
    pub is_playing: bool,
    pub tempo_bpm: u16,
    pub beats_per_bar: u32,
    pub anchor: ServerAnchor,
}

/// Client-side synchronized metronome engine.
pub struct MetronomeEngine {
    config: EngineConfig,
    output: Box<dyn AudioOutput>,
    clock: Box<dyn WallClock>,
    fsm: PlaybackFsm,
    scheduler: BeatScheduler,
    drift_policy: DriftPolicy,
    tap: TapTempo,
    observers: Observers,

    tempo_bpm: u16,
    beats_per_bar: u32,
    /// `local_now - server_epoch_ms` at the last broadcast.
    clock_offset_ms: f64,
    /// Local wall-clock time of beat 0 for the current session.
    local_start_ms: f64,
    /// Server anchor of the last broadcast; a changed value signals a
    /// server-driven phase reset.
    last_start_epoch_ms: Option<f64>,

    is_initializing: bool,
    is_starting: bool,
}

impl MetronomeEngine {
    pub fn new(
        output: Box<dyn AudioOutput>,
        clock: Box<dyn WallClock>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = BeatScheduler::new(
            f64::from(config.tempo_bpm),
            config.beats_per_bar,
            config.schedule_ahead_sec,
            config.min_lookahead_sec,
        );
        let drift_policy = DriftPolicy {
            floor_sec: config.drift_floor_sec,
            beat_fraction: config.drift_beat_fraction,
            stale_beats: config.stale_correction_beats,
        };
        Ok(Self {
            tempo_bpm: config.tempo_bpm,
            beats_per_bar: config.beats_per_bar,
            config,
            output,
            clock,
            fsm: PlaybackFsm::new(),
            scheduler,
            drift_policy,
            tap: TapTempo::new(),
            observers: Observers::default(),
            clock_offset_ms: 0.0,
            local_start_ms: 0.0,
            last_start_epoch_ms: None,
            is_initializing: false,
            is_starting: false,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.add(observer);
    }

    // ---- accessors -------------------------------------------------------

    pub fn tempo(&self) -> u16 {
        self.tempo_bpm
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn is_playing(&self) -> bool {
        self.fsm.is_playing()
    }

    pub fn is_audio_ready(&self) -> bool {
        self.fsm.is_ready()
    }

    pub fn state(&self) -> PlaybackState {
        self.fsm.state()
    }

    pub fn clock_offset_ms(&self) -> f64 {
        self.clock_offset_ms
    }

    pub fn tap_count(&self) -> usize {
        self.tap.len()
    }

    // ---- lifecycle -------------------------------------------------------

    /// Acquire the audio resource (user-gesture-triggered).
    ///
    /// Returns `Ok(true)` once ready, `Ok(false)` when skipped because an
    /// initialize is already in flight. Transient resource failures are
    /// retried a bounded number of times with increasing backoff;
    /// permanent ones surface immediately.
    pub fn initialize(&mut self) -> Result<bool> {
        if self.is_initializing {
            tracing::warn!("initialize already in flight");
            return Ok(false);
        }
        self.is_initializing = true;
        let result = self.initialize_inner();
        self.is_initializing = false;
        result.map(|_| true)
    }

    fn initialize_inner(&mut self) -> Result<()> {
        if self.fsm.is_ready() {
            return Ok(());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.output.acquire().and_then(|_| self.output.resume()) {
                Ok(()) => break,
                Err(e) if e.is_retryable() && attempt <= self.config.init_retries => {
                    tracing::warn!(attempt, "audio resource acquisition failed: {e}");
                    std::thread::sleep(Duration::from_millis(
                        self.config.init_backoff_ms * u64::from(attempt),
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        self.fsm.transition(PlaybackEvent::AudioReady);
        tracing::debug!("engine ready");
        Ok(())
    }

    /// Start playback anchored at "now" (local intent).
    ///
    /// Returns `Ok(true)` when playback actually started; `Ok(false)` when
    /// already playing or a start is in flight (single-flight guard).
    pub fn start(&mut self) -> Result<bool> {
        self.start_with_anchor(None)
    }

    /// Start playback in phase with a running session whose beat 0 was at
    /// `local_start_ms` (remote-driven; emits no outbound intent).
    pub fn start_anchored(&mut self, local_start_ms: f64) -> Result<bool> {
        self.start_with_anchor(Some(local_start_ms))
    }

    fn start_with_anchor(&mut self, local_start_ms: Option<f64>) -> Result<bool> {
        if self.is_starting {
            tracing::warn!("start already in flight");
            return Ok(false);
        }
        if self.fsm.is_playing() {
            return Ok(false);
        }

        self.is_starting = true;
        let result = self.start_inner(local_start_ms);
        self.is_starting = false;
        result
    }

    fn start_inner(&mut self, local_start_ms: Option<f64>) -> Result<bool> {
        if !self.fsm.is_ready() {
            self.initialize_inner()?;
        }
        self.output.resume()?;

        let now_ms = self.clock.now_ms();
        let audio_now = self.output.audio_time();

        self.scheduler.set_tempo(f64::from(self.tempo_bpm));
        self.scheduler.set_beats_per_bar(self.beats_per_bar);

        match local_start_ms {
            None => {
                self.local_start_ms = now_ms;
                self.scheduler.anchor_now(audio_now);
            }
            Some(start_ms) => {
                self.local_start_ms = start_ms;
                self.scheduler
                    .anchor_from_elapsed(audio_now, now_ms - start_ms);
            }
        }

        if self.fsm.transition(PlaybackEvent::Play) == Transition::Entered(PlaybackState::Playing) {
            self.observers.notify_play_state(true);
        }
        Ok(true)
    }

    /// Stop playback. Idempotent: stopping an already-stopped engine emits
    /// no notification.
    pub fn stop(&mut self) {
        if !self.fsm.is_playing() {
            return;
        }
        self.output.cancel_pending();
        self.scheduler.reset();
        if self.fsm.transition(PlaybackEvent::Stop) == Transition::Entered(PlaybackState::Stopped) {
            self.observers.notify_play_state(false);
        }
    }

    /// Stop, release the audio resource and return to `Uninitialized`.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        self.stop();
        self.output.release();
        self.fsm.transition(PlaybackEvent::Teardown);
    }

    // ---- scheduling ------------------------------------------------------

    /// Pump the lookahead scheduler. Call on a coarse periodic tick
    /// (nominally 16-25 ms); never blocks.
    ///
    /// A failed click emission skips that beat rather than aborting the
    /// loop; the beat notification still fires.
    pub fn tick(&mut self) {
        if !self.fsm.is_playing() {
            return;
        }
        let audio_now = self.output.audio_time();
        let output = &mut self.output;
        let observers = &mut self.observers;
        self.scheduler.pump(audio_now, |beat| {
            observers.notify_beat(beat.beat, beat.beats_per_bar);
            if let Err(e) = output.schedule_click(beat.at, beat.accent) {
                tracing::debug!(beat = beat.beat, "click emission failed, skipping: {e}");
            }
        });
    }

    // ---- tempo / beats ---------------------------------------------------

    /// Apply a tempo change (local intent or server value with an
    /// unchanged anchor). While playing this is a phase-preserving
    /// retarget: the upcoming beat keeps its identity.
    pub fn set_tempo(&mut self, bpm: u16) -> Result<()> {
        if !(TEMPO_MIN..=TEMPO_MAX).contains(&bpm) {
            return Err(Error::InvalidTempo(bpm));
        }
        if bpm == self.tempo_bpm {
            return Ok(());
        }
        self.tempo_bpm = bpm;
        if self.fsm.is_playing() {
            self.scheduler
                .retarget_tempo(f64::from(bpm), self.output.audio_time());
        } else {
            self.scheduler.set_tempo(f64::from(bpm));
        }
        self.observers.notify_tempo(bpm);
        Ok(())
    }

    /// Apply a beats-per-bar change. Only the accent cycle changes; no
    /// rescheduling of audio timing happens.
    pub fn set_beats_per_bar(&mut self, beats: u32) -> Result<()> {
        if !(BEATS_MIN..=BEATS_MAX).contains(&beats) {
            return Err(Error::InvalidBeats(beats));
        }
        if beats == self.beats_per_bar {
            return Ok(());
        }
        self.beats_per_bar = beats;
        self.scheduler.set_beats_per_bar(beats);
        self.observers.notify_beats(beats);
        Ok(())
    }

    // ---- tap tempo -------------------------------------------------------

    /// Record a tap; returns the BPM estimate (the current tempo while
    /// fewer than two taps are recorded). The caller decides whether to
    /// apply it via [`set_tempo`](Self::set_tempo).
    pub fn tap(&mut self) -> u16 {
        let now_ms = self.clock.now_ms();
        self.tap.tap(now_ms, self.tempo_bpm)
    }

    pub fn clear_taps(&mut self) {
        self.tap.clear();
    }

    // ---- reconciliation --------------------------------------------------

    /// Apply an authoritative broadcast.
    ///
    /// Server wins: tempo/beats differences are applied (retarget when the
    /// anchor is unchanged, re-anchor when it moved), play-state
    /// differences drive the same start/stop transitions as local intents
    /// but never emit outbound messages, and steady-state drift is
    /// corrected only beyond the jitter threshold and below the staleness
    /// bound.
    pub fn apply_remote_state(&mut self, remote: &RemoteState) -> Result<()> {
        let now_ms = self.clock.now_ms();
        let translated = remote.anchor.translate(now_ms);
        self.clock_offset_ms = translated.offset_ms;

        let anchor_changed = self
            .last_start_epoch_ms
            .map_or(true, |s| (s - remote.anchor.start_epoch_ms).abs() > 0.5);
        self.last_start_epoch_ms = Some(remote.anchor.start_epoch_ms);

        if remote.tempo_bpm != self.tempo_bpm {
            if self.fsm.is_playing() && anchor_changed {
                // The re-anchor below rebuilds timing; just record + notify.
                self.tempo_bpm = remote.tempo_bpm;
                self.scheduler.set_tempo(f64::from(remote.tempo_bpm));
                self.observers.notify_tempo(remote.tempo_bpm);
            } else {
                self.set_tempo(remote.tempo_bpm)?;
            }
        }
        if remote.beats_per_bar != self.beats_per_bar {
            self.set_beats_per_bar(remote.beats_per_bar)?;
        }

        if remote.is_playing != self.fsm.is_playing() {
            if remote.is_playing {
                self.start_anchored(translated.local_start_ms)?;
            } else {
                self.stop();
            }
            return Ok(());
        }

        if !remote.is_playing {
            return Ok(());
        }

        if anchor_changed {
            // Server-driven phase reset: discard counters, recompute from
            // the new anchor.
            let audio_now = self.output.audio_time();
            self.local_start_ms = translated.local_start_ms;
            self.scheduler
                .anchor_from_elapsed(audio_now, now_ms - translated.local_start_ms);
            tracing::debug!("re-anchored to new server start");
            return Ok(());
        }

        // Steady playback: bounded drift reconciliation.
        let audio_now = self.output.audio_time();
        let (expected_time, expected_counter) = reconcile::expected_next_beat(
            translated.local_start_ms,
            now_ms,
            audio_now,
            f64::from(self.tempo_bpm),
            self.beats_per_bar,
        );
        match reconcile::classify(
            self.scheduler.next_beat_time(),
            expected_time,
            expected_counter,
            f64::from(self.tempo_bpm),
            &self.drift_policy,
        ) {
            Correction::InThreshold { delta_sec } => {
                tracing::trace!(delta_sec, "drift within threshold");
            }
            Correction::Apply {
                next_beat_time,
                beat_counter,
                delta_sec,
            } => {
                tracing::debug!(delta_sec, "applying drift correction");
                self.local_start_ms = translated.local_start_ms;
                self.scheduler.reschedule(next_beat_time, beat_counter);
            }
            Correction::Stale { delta_sec } => {
                tracing::warn!(delta_sec, "correction exceeds sanity bound, ignoring");
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn scheduler(&self) -> &BeatScheduler {
        &self.scheduler
    }
}
