//! Reconciliation of scheduler state against the authoritative anchor.
//!
//! On every broadcast received while playing, the expected next-beat time
//! is recomputed from the translated server anchor. Small discrepancies
//! are normal jitter and left alone; moderate ones are corrected; ones
//! beyond a couple of beats indicate a stale or corrupt message and are
//! dropped.

/// Thresholds governing when an anchor-derived correction is applied.
#[derive(Debug, Clone, Copy)]
pub struct DriftPolicy {
    /// Corrections below `max(floor, beat_fraction * beat)` are ignored.
    pub floor_sec: f64,
    pub beat_fraction: f64,
    /// Corrections beyond this many beats are treated as stale.
    pub stale_beats: f64,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            floor_sec: 0.2,
            beat_fraction: 0.3,
            stale_beats: 2.0,
        }
    }
}

/// Outcome of comparing the current schedule against the anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Discrepancy within normal jitter; leave the schedule alone.
    InThreshold { delta_sec: f64 },
    /// Apply the recomputed anchor.
    Apply {
        next_beat_time: f64,
        beat_counter: u32,
        delta_sec: f64,
    },
    /// Discrepancy exceeds the sanity bound; ignore the message.
    Stale { delta_sec: f64 },
}

/// Expected next-beat audio time and beat index, derived from the
/// translated anchor.
///
/// A start still in the future (negative elapsed time) yields beat 0 at
/// the anchor itself.
pub fn expected_next_beat(
    local_start_ms: f64,
    local_now_ms: f64,
    audio_now: f64,
    tempo_bpm: f64,
    beats_per_bar: u32,
) -> (f64, u32) {
    let spb = 60.0 / tempo_bpm;
    let elapsed_beats = (local_now_ms - local_start_ms) / 1000.0 / spb;
    let next_index = elapsed_beats.ceil().max(0.0);

    let next_time = audio_now + (next_index - elapsed_beats) * spb;
    let counter = (next_index as u64 % u64::from(beats_per_bar)) as u32;
    (next_time, counter)
}

/// Decide whether a recomputed anchor should replace the current schedule.
pub fn classify(
    current_next_beat: f64,
    expected_next_beat: f64,
    expected_counter: u32,
    tempo_bpm: f64,
    policy: &DriftPolicy,
) -> Correction {
    let spb = 60.0 / tempo_bpm;
    let delta_sec = (expected_next_beat - current_next_beat).abs();
    let threshold = policy.floor_sec.max(policy.beat_fraction * spb);

    if delta_sec <= threshold {
        Correction::InThreshold { delta_sec }
    } else if delta_sec < policy.stale_beats * spb {
        Correction::Apply {
            next_beat_time: expected_next_beat,
            beat_counter: expected_counter,
            delta_sec,
        }
    } else {
        Correction::Stale { delta_sec }
    }
}
