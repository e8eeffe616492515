//! Shared fakes for integration tests: a deterministic audio output and
//! wall clock, plus a recording message sink.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use beatroom::core::Result;
use beatroom::{AudioOutput, EngineConfig, MetronomeEngine, WallClock};
use beatroom_sync::MessageSink;

#[derive(Clone, Default)]
pub struct FakeOutput {
    pub time: Rc<Cell<f64>>,
    pub clicks: Rc<RefCell<Vec<(f64, bool)>>>,
    pub cancels: Rc<Cell<u32>>,
}

impl AudioOutput for FakeOutput {
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }
    fn resume(&mut self) -> Result<()> {
        Ok(())
    }
    fn audio_time(&self) -> f64 {
        self.time.get()
    }
    fn schedule_click(&mut self, at: f64, accent: bool) -> Result<()> {
        self.clicks.borrow_mut().push((at, accent));
        Ok(())
    }
    fn cancel_pending(&mut self) {
        self.cancels.set(self.cancels.get() + 1);
    }
    fn release(&mut self) {}
}

#[derive(Clone, Default)]
pub struct ManualClock {
    pub ms: Rc<Cell<f64>>,
}

impl WallClock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.ms.get()
    }
}

#[derive(Clone, Default)]
pub struct FakeSink {
    pub sent: Rc<RefCell<Vec<String>>>,
}

impl MessageSink for FakeSink {
    fn send(&mut self, payload: &str) -> beatroom_sync::Result<()> {
        self.sent.borrow_mut().push(payload.to_string());
        Ok(())
    }
}

impl FakeSink {
    /// Sent payloads decoded to JSON for structural assertions.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .borrow()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }
}

pub fn test_engine() -> (FakeOutput, ManualClock, MetronomeEngine) {
    let output = FakeOutput::default();
    let clock = ManualClock::default();
    let engine = MetronomeEngine::new(
        Box::new(output.clone()),
        Box::new(clock.clone()),
        EngineConfig::default(),
    )
    .unwrap();
    (output, clock, engine)
}
