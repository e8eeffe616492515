//! Engine configuration.

use crate::{Error, Result};

/// Minimum tempo the engine accepts, in BPM.
pub const TEMPO_MIN: u16 = 40;
/// Maximum tempo the engine accepts, in BPM.
pub const TEMPO_MAX: u16 = 240;
/// Minimum beats per bar.
pub const BEATS_MIN: u32 = 2;
/// Maximum beats per bar.
pub const BEATS_MAX: u32 = 8;

/// Configuration for the metronome engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial tempo in BPM.
    pub tempo_bpm: u16,
    /// Initial beats per bar (accent cycle length).
    pub beats_per_bar: u32,
    /// Lookahead window in seconds. Must exceed the worst-case jitter of the
    /// driving tick so at least one beat is always scheduled ahead.
    pub schedule_ahead_sec: f64,
    /// Minimum positive lookahead when (re)anchoring the next beat.
    pub min_lookahead_sec: f64,
    /// Drift corrections below `max(floor, fraction * beat)` are ignored.
    pub drift_floor_sec: f64,
    pub drift_beat_fraction: f64,
    /// Corrections beyond this many beats are treated as stale and dropped.
    pub stale_correction_beats: f64,
    /// Bounded retries for audio resource acquisition.
    pub init_retries: u32,
    /// Backoff between retries, in milliseconds, scaled by attempt number.
    pub init_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120,
            beats_per_bar: 4,
            schedule_ahead_sec: 0.05,
            min_lookahead_sec: 0.001,
            drift_floor_sec: 0.2,
            drift_beat_fraction: 0.3,
            stale_correction_beats: 2.0,
            init_retries: 3,
            init_backoff_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tempo_bpm < TEMPO_MIN || self.tempo_bpm > TEMPO_MAX {
            return Err(Error::InvalidTempo(self.tempo_bpm));
        }
        if self.beats_per_bar < BEATS_MIN || self.beats_per_bar > BEATS_MAX {
            return Err(Error::InvalidBeats(self.beats_per_bar));
        }
        if self.schedule_ahead_sec <= 0.0 || self.schedule_ahead_sec > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "schedule_ahead_sec {} out of range (0-1 s)",
                self.schedule_ahead_sec
            )));
        }
        if self.min_lookahead_sec <= 0.0 || self.min_lookahead_sec >= self.schedule_ahead_sec {
            return Err(Error::InvalidConfig(format!(
                "min_lookahead_sec {} must be positive and below the lookahead window",
                self.min_lookahead_sec
            )));
        }
        if self.drift_floor_sec < 0.0 || self.drift_beat_fraction < 0.0 {
            return Err(Error::InvalidConfig(
                "drift thresholds must be non-negative".into(),
            ));
        }
        if self.stale_correction_beats <= 0.0 {
            return Err(Error::InvalidConfig(
                "stale_correction_beats must be positive".into(),
            ));
        }
        Ok(())
    }
}
