#![allow(dead_code)]
//! Test harness utilities for cadence-arp integration tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cadence_arp::ArpeggiatorManager;
use cadence_core::config::ArpDefaults;
use cadence_core::{MidiSink, ParamRegistry};
use cadence_types::{paths, MidiEvent, NoteDuration, ParamSpec};

/// Downstream sink that records everything the arpeggiator sends.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MidiEvent>>,
}

impl MidiSink for RecordingSink {
    fn process_midi_event_direct(&self, event: MidiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MidiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Pitches of every note-on, in emission order.
    pub fn note_ons(&self) -> Vec<u8> {
        self.events()
            .iter()
            .filter(|e| e.is_note_on())
            .filter_map(|e| e.note())
            .collect()
    }

    pub fn note_off_count(&self) -> usize {
        self.events().iter().filter(|e| e.is_note_off()).count()
    }

    /// Panics if any pitch received more note-ons than note-offs.
    pub fn assert_no_stuck_notes(&self) {
        let mut sounding = [0i32; 128];
        for e in self.events() {
            if let Some(n) = e.note() {
                if e.is_note_on() {
                    sounding[n as usize] += 1;
                } else if e.is_note_off() {
                    sounding[n as usize] -= 1;
                }
            }
        }
        for (note, count) in sounding.iter().enumerate() {
            assert!(*count <= 0, "note {} left sounding ({} unmatched)", note, count);
        }
    }
}

/// An enabled arpeggiator on 1/32 notes (2 pulses on, 1 off).
pub fn enabled_arp(registry: &ParamRegistry) -> (ArpeggiatorManager, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let defaults = ArpDefaults {
        enabled: true,
        note_duration: NoteDuration::ThirtySecond,
        ..ArpDefaults::default()
    };
    let manager = ArpeggiatorManager::new(registry, sink.clone(), &defaults, false, false);
    (manager, sink)
}

/// Registry with the external MIDI clock selected.
pub fn midi_clocked_registry() -> ParamRegistry {
    let registry = ParamRegistry::new();
    registry.register(ParamSpec::toggle(paths::MIDI_CLOCK_IN, true));
    registry
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
