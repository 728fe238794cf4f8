#![allow(dead_code)]
//! Test harness utilities for cadence-core integration tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cadence_core::EventHandler;
use cadence_types::{Event, EventSource, MidiEvent, ParamChange, SystemFunc};

/// Handler that records every dispatched event, in dispatch order.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl EventHandler for Recorder {
    fn on_midi_note(&mut self, source: EventSource, midi: MidiEvent) {
        self.push(Event::midi_note(source, midi));
    }

    fn on_param_changed(&mut self, source: EventSource, change: ParamChange) {
        self.push(Event::param_changed(source, change));
    }

    fn on_system_func(&mut self, source: EventSource, func: SystemFunc) {
        self.push(Event::system_func(source, func));
    }

    fn on_reload_presets(&mut self, source: EventSource, from_ab_toggle: bool) {
        self.push(Event::reload_presets(source, from_ab_toggle));
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
