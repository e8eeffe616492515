//! End-to-end playback behavior, observed through the audio output.

mod helpers;

use approx::assert_relative_eq;
use helpers::test_engine;

/// Drive the tick with a deliberately jittery cadence and collect clicks.
fn pump_until(
    output: &helpers::FakeOutput,
    engine: &mut beatroom::MetronomeEngine,
    count: usize,
) -> Vec<(f64, bool)> {
    let mut t = output.time.get();
    let mut i = 0u32;
    while output.clicks.borrow().len() < count {
        output.time.set(t);
        engine.tick();
        t += if i % 3 == 0 { 0.025 } else { 0.016 };
        i += 1;
    }
    output.clicks.borrow().clone()
}

#[test]
fn test_clicks_are_exactly_one_beat_apart_despite_tick_jitter() {
    let (output, _, mut engine) = test_engine();
    engine.initialize().unwrap();
    engine.start().unwrap();

    let clicks = pump_until(&output, &mut engine, 9);
    for pair in clicks.windows(2) {
        assert_relative_eq!(pair[1].0 - pair[0].0, 0.5, epsilon = 1e-9);
    }
}

#[test]
fn test_accent_falls_on_every_bar_start() {
    let (output, _, mut engine) = test_engine();
    engine.set_beats_per_bar(3).unwrap();
    engine.start().unwrap();

    let clicks = pump_until(&output, &mut engine, 7);
    let accents: Vec<bool> = clicks.iter().map(|c| c.1).collect();
    assert_eq!(accents, vec![true, false, false, true, false, false, true]);
}

#[test]
fn test_tempo_change_mid_bar_keeps_the_pulse_coherent() {
    let (output, _, mut engine) = test_engine();
    engine.start().unwrap();
    let before = pump_until(&output, &mut engine, 3);

    // 120 -> 90 bpm: no beat may be dropped or doubled around the change.
    engine.set_tempo(90).unwrap();
    let all = pump_until(&output, &mut engine, 6);

    // Beats before the change keep the old spacing.
    assert_relative_eq!(before[2].0 - before[1].0, 0.5, epsilon = 1e-9);
    // Beats after it settle on the new period.
    assert_relative_eq!(all[5].0 - all[4].0, 60.0 / 90.0, epsilon = 1e-9);
    // Strictly increasing click times: nothing scheduled in the past.
    for pair in all.windows(2) {
        assert!(pair[1].0 > pair[0].0);
    }
}

#[test]
fn test_stop_cancels_pending_and_restart_accents_beat_zero() {
    let (output, _, mut engine) = test_engine();
    engine.start().unwrap();
    pump_until(&output, &mut engine, 3);

    engine.stop();
    assert_eq!(output.cancels.get(), 1);
    assert!(!engine.is_playing());

    output.clicks.borrow_mut().clear();
    engine.start().unwrap();
    let clicks = pump_until(&output, &mut engine, 1);
    assert!(clicks[0].1);
}

#[test]
fn test_late_joiner_lands_in_phase_with_the_room() {
    let (output, clock, mut engine) = test_engine();
    clock.ms.set(10_000.0);
    output.time.set(100.0);

    // The session began 3.5s before this broadcast left the server:
    // offset = 10_000 - 9_900 = 100ms, local start = 6_500, so 3.5s =
    // exactly 7 beats have elapsed at 120 bpm.
    engine
        .apply_remote_state(&beatroom::RemoteState {
            is_playing: true,
            tempo_bpm: 120,
            beats_per_bar: 4,
            anchor: beatroom::ServerAnchor {
                start_epoch_ms: 6_400.0,
                server_epoch_ms: 9_900.0,
            },
        })
        .unwrap();
    assert_relative_eq!(engine.clock_offset_ms(), 100.0, epsilon = 1e-9);

    // 7 beats elapsed exactly: beat 7 (counter 3) is due right now.
    let clicks = pump_until(&output, &mut engine, 2);
    assert_relative_eq!(clicks[0].0, 100.0, epsilon = 1e-9);
    assert!(!clicks[0].1);
    assert_relative_eq!(clicks[1].0, 100.5, epsilon = 1e-9);
    assert!(clicks[1].1); // beat 8 wraps to the bar start
}

#[test]
fn test_tap_tempo_applies_averaged_interval() {
    let (_, clock, mut engine) = test_engine();
    for (i, at) in [0.0, 500.0, 1_000.0, 1_500.0].iter().enumerate() {
        clock.ms.set(*at);
        let bpm = engine.tap();
        if i > 0 {
            assert_eq!(bpm, 120);
        }
    }
    // Further taps evict the oldest; two at 250ms spacing pull the
    // average interval down and the tempo up.
    clock.ms.set(1_750.0);
    engine.tap();
    clock.ms.set(2_000.0);
    // History is now [1000, 1500, 1750, 2000]: mean interval 333ms.
    assert_eq!(engine.tap(), 180);
    assert_eq!(engine.tap_count(), 4);
}
