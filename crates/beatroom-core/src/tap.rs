//! Tap-tempo estimation from a bounded history of tap timestamps.

use std::collections::VecDeque;

use crate::config::{TEMPO_MAX, TEMPO_MIN};

/// Maximum taps kept; oldest is evicted on overflow.
pub const MAX_TAPS: usize = 4;

/// Converts user tap timestamps into a BPM estimate.
#[derive(Debug, Default)]
pub struct TapTempo {
    taps: VecDeque<f64>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(MAX_TAPS),
        }
    }

    /// Record a tap at `now_ms` and return the BPM estimate.
    ///
    /// Returns `current_bpm` unchanged while fewer than two taps are
    /// recorded. The estimate is the mean of consecutive inter-tap
    /// intervals, clamped to the supported tempo range.
    pub fn tap(&mut self, now_ms: f64, current_bpm: u16) -> u16 {
        self.taps.push_back(now_ms);
        if self.taps.len() > MAX_TAPS {
            self.taps.pop_front();
        }
        if self.taps.len() < 2 {
            return current_bpm;
        }

        let intervals: Vec<f64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        let avg_ms = intervals.iter().sum::<f64>() / intervals.len() as f64;

        // `as` saturates, so a zero interval clamps to TEMPO_MAX.
        let bpm = (60_000.0 / avg_ms).round() as i64;
        bpm.clamp(i64::from(TEMPO_MIN), i64::from(TEMPO_MAX)) as u16
    }

    /// Empty the history without affecting the current tempo.
    pub fn clear(&mut self) {
        self.taps.clear();
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_interval_of_500ms_is_120_bpm() {
        let mut tap = TapTempo::new();
        tap.tap(0.0, 90);
        tap.tap(500.0, 90);
        assert_eq!(tap.tap(1000.0, 90), 120);
    }

    #[test]
    fn test_single_tap_returns_prior_tempo() {
        let mut tap = TapTempo::new();
        assert_eq!(tap.tap(0.0, 97), 97);
    }

    #[test]
    fn test_clear_then_single_tap_returns_prior_tempo() {
        let mut tap = TapTempo::new();
        tap.tap(0.0, 120);
        tap.tap(500.0, 120);
        tap.clear();
        assert!(tap.is_empty());
        assert_eq!(tap.tap(2000.0, 120), 120);
        assert_eq!(tap.len(), 1);
    }

    #[test]
    fn test_history_bounded_at_four() {
        let mut tap = TapTempo::new();
        // First two taps 1s apart (60 bpm), then four at 250ms (240 bpm).
        // Once the slow taps are evicted only the fast intervals remain.
        tap.tap(0.0, 120);
        tap.tap(1000.0, 120);
        tap.tap(1250.0, 120);
        tap.tap(1500.0, 120);
        tap.tap(1750.0, 120);
        let bpm = tap.tap(2000.0, 120);
        assert_eq!(tap.len(), MAX_TAPS);
        assert_eq!(bpm, 240);
    }

    #[test]
    fn test_estimate_clamped_to_range() {
        let mut tap = TapTempo::new();
        tap.tap(0.0, 120);
        // 10s interval -> 6 bpm, clamps to 40.
        assert_eq!(tap.tap(10_000.0, 120), 40);

        let mut tap = TapTempo::new();
        tap.tap(0.0, 120);
        // 50ms interval -> 1200 bpm, clamps to 240.
        assert_eq!(tap.tap(50.0, 120), 240);
    }
}
