//! Observer interface for engine notifications.
//!
//! Notifications fire synchronously within the tick or handler that
//! produced them and are never reordered relative to the state change
//! they describe.

/// Receives engine state-change notifications.
///
/// All methods have empty defaults; implement only what the caller needs.
pub trait EngineObserver {
    /// A beat was scheduled. Best-effort UI signal, not sample-accurate.
    fn on_beat(&mut self, _beat: u32, _beats_per_bar: u32) {}

    fn on_tempo_change(&mut self, _bpm: u16) {}

    fn on_beats_change(&mut self, _beats_per_bar: u32) {}

    fn on_play_state_change(&mut self, _is_playing: bool) {}
}

/// Registered observer list with synchronous dispatch.
#[derive(Default)]
pub(crate) struct Observers {
    list: Vec<Box<dyn EngineObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Box<dyn EngineObserver>) {
        self.list.push(observer);
    }

    pub(crate) fn notify_beat(&mut self, beat: u32, beats_per_bar: u32) {
        for o in &mut self.list {
            o.on_beat(beat, beats_per_bar);
        }
    }

    pub(crate) fn notify_tempo(&mut self, bpm: u16) {
        for o in &mut self.list {
            o.on_tempo_change(bpm);
        }
    }

    pub(crate) fn notify_beats(&mut self, beats_per_bar: u32) {
        for o in &mut self.list {
            o.on_beats_change(beats_per_bar);
        }
    }

    pub(crate) fn notify_play_state(&mut self, is_playing: bool) {
        for o in &mut self.list {
            o.on_play_state_change(is_playing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl EngineObserver for Recorder {
        fn on_beat(&mut self, beat: u32, beats_per_bar: u32) {
            self.events
                .borrow_mut()
                .push(format!("beat {beat}/{beats_per_bar}"));
        }
        fn on_play_state_change(&mut self, is_playing: bool) {
            self.events.borrow_mut().push(format!("playing {is_playing}"));
        }
    }

    #[test]
    fn test_dispatch_order_is_registration_order() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::default();
        observers.add(Box::new(Recorder {
            events: Rc::clone(&events),
        }));
        observers.add(Box::new(Recorder {
            events: Rc::clone(&events),
        }));

        observers.notify_play_state(true);
        observers.notify_beat(0, 4);

        assert_eq!(
            *events.borrow(),
            vec!["playing true", "playing true", "beat 0/4", "beat 0/4"]
        );
    }
}
