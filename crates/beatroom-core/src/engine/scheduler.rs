//! Lookahead beat scheduler.
//!
//! Keeps the next click time in the audio-hardware clock domain and, on
//! every pump, schedules each beat that falls inside the lookahead window.
//! The driving tick can be coarse and jittery (16-25 ms is fine); audible
//! precision comes from the output honoring exact start times, not from
//! the tick cadence.

/// A beat the pump decided to schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBeat {
    /// Exact start time on the audio clock, in seconds.
    pub at: f64,
    /// 0-based beat index within the bar.
    pub beat: u32,
    pub beats_per_bar: u32,
    /// Beat 0 of the bar gets the accent timbre.
    pub accent: bool,
}

#[derive(Debug)]
pub struct BeatScheduler {
    tempo_bpm: f64,
    beats_per_bar: u32,
    beat_counter: u32,
    next_beat_time: f64,
    schedule_ahead: f64,
    min_lookahead: f64,
}

impl BeatScheduler {
    pub fn new(tempo_bpm: f64, beats_per_bar: u32, schedule_ahead: f64, min_lookahead: f64) -> Self {
        Self {
            tempo_bpm,
            beats_per_bar,
            beat_counter: 0,
            next_beat_time: 0.0,
            schedule_ahead,
            min_lookahead,
        }
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn beat_counter(&self) -> u32 {
        self.beat_counter
    }

    pub fn next_beat_time(&self) -> f64 {
        self.next_beat_time
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo_bpm
    }

    /// Anchor beat 0 at "now": the first click lands one minimum lookahead
    /// after the current audio time.
    pub fn anchor_now(&mut self, audio_now: f64) {
        self.beat_counter = 0;
        self.next_beat_time = audio_now + self.min_lookahead;
    }

    /// Anchor against a session that began `elapsed_ms` ago (negative for a
    /// start still in the future). Picks the upcoming beat index and its
    /// exact audio time so a late joiner lands in phase with the room.
    pub fn anchor_from_elapsed(&mut self, audio_now: f64, elapsed_ms: f64) {
        let spb = self.seconds_per_beat();
        let elapsed_beats = elapsed_ms / 1000.0 / spb;
        let next_index = elapsed_beats.ceil().max(0.0);

        self.beat_counter = (next_index as u64 % u64::from(self.beats_per_bar)) as u32;
        self.next_beat_time = audio_now + (next_index - elapsed_beats) * spb;
    }

    /// Schedule every beat inside the lookahead window.
    ///
    /// `emit` is called once per beat, in order. The counter and next-beat
    /// time advance unconditionally, so a failed emit skips that beat
    /// rather than stalling the loop.
    pub fn pump<F: FnMut(ScheduledBeat)>(&mut self, audio_now: f64, mut emit: F) {
        while self.next_beat_time <= audio_now + self.schedule_ahead {
            emit(ScheduledBeat {
                at: self.next_beat_time,
                beat: self.beat_counter,
                beats_per_bar: self.beats_per_bar,
                accent: self.beat_counter == 0,
            });
            self.next_beat_time += self.seconds_per_beat();
            self.beat_counter = (self.beat_counter + 1) % self.beats_per_bar;
        }
    }

    /// Set the tempo without touching timing (stopped state).
    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo_bpm = bpm;
    }

    /// Phase-preserving instantaneous retarget.
    ///
    /// The upcoming beat keeps its identity: the remaining wait to it is
    /// rescaled by the ratio of beat periods (old over new BPM) and floored
    /// to a minimum positive lookahead, so no beat is skipped or repeated
    /// and there is no audible stutter.
    pub fn retarget_tempo(&mut self, new_bpm: f64, audio_now: f64) {
        let old_bpm = self.tempo_bpm;
        if (new_bpm - old_bpm).abs() < f64::EPSILON {
            return;
        }
        let remaining = (self.next_beat_time - audio_now).max(0.0);
        let rescaled = remaining * (old_bpm / new_bpm);
        self.tempo_bpm = new_bpm;
        self.next_beat_time = audio_now + rescaled.max(self.min_lookahead);
    }

    /// Change the bar length. Only the accent cycle changes; the counter is
    /// reduced modulo the new value and no rescheduling happens.
    pub fn set_beats_per_bar(&mut self, beats: u32) {
        self.beats_per_bar = beats;
        self.beat_counter %= beats;
    }

    /// Overwrite the scheduling anchor (drift correction or re-anchor).
    pub fn reschedule(&mut self, next_beat_time: f64, beat_counter: u32) {
        self.next_beat_time = next_beat_time;
        self.beat_counter = beat_counter % self.beats_per_bar;
    }

    /// Reset the counter (on stop).
    pub fn reset(&mut self) {
        self.beat_counter = 0;
    }
}
