//! Downstream note sink standing in for the audio-engine client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cadence_core::{EventHandler, ManagerRuntime, MidiSink};
use cadence_types::{EventSource, MidiEvent, SystemFunc, SystemFuncType};

#[derive(Debug, Default)]
pub struct NoteCounters {
    note_ons: AtomicU64,
    note_offs: AtomicU64,
    other: AtomicU64,
}

impl NoteCounters {
    pub fn note_ons(&self) -> u64 {
        self.note_ons.load(Ordering::Relaxed)
    }

    pub fn note_offs(&self) -> u64 {
        self.note_offs.load(Ordering::Relaxed)
    }

    pub fn other(&self) -> u64 {
        self.other.load(Ordering::Relaxed)
    }
}

/// Direct-call entry point of the DAW manager.
#[derive(Debug, Clone, Default)]
pub struct DawOutput {
    counters: Arc<NoteCounters>,
    voices: Arc<Mutex<Vec<MidiEvent>>>,
}

impl DawOutput {
    pub fn counters(&self) -> &NoteCounters {
        &self.counters
    }

    fn voices(&self) -> MutexGuard<'_, Vec<MidiEvent>> {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Notes currently sounding, one per channel and pitch.
    pub fn sounding(&self) -> usize {
        self.voices().len()
    }

    /// Release every sounding voice. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let voices = std::mem::take(&mut *self.voices());
        for off in voices.iter().filter_map(|v| v.to_note_off()) {
            self.process_midi_event_direct(off);
        }
        voices.len()
    }
}

fn same_voice(a: &MidiEvent, b: &MidiEvent) -> bool {
    a.channel() == b.channel() && a.note() == b.note()
}

impl MidiSink for DawOutput {
    fn process_midi_event_direct(&self, event: MidiEvent) {
        if event.is_note_on() {
            self.counters.note_ons.fetch_add(1, Ordering::Relaxed);
            let mut voices = self.voices();
            if !voices.iter().any(|v| same_voice(v, &event)) {
                voices.push(event);
            }
        } else if event.is_note_off() {
            self.counters.note_offs.fetch_add(1, Ordering::Relaxed);
            self.voices().retain(|v| !same_voice(v, &event));
        } else {
            self.counters.other.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!(target: "daw", "{:?}", event.kind);
    }
}

/// Notes routed over the bus land here as well.
pub struct DawHandler {
    output: DawOutput,
}

impl EventHandler for DawHandler {
    fn on_midi_note(&mut self, _source: EventSource, midi: MidiEvent) {
        self.output.process_midi_event_direct(midi);
    }

    fn on_system_func(&mut self, source: EventSource, func: SystemFunc) {
        if func.func != SystemFuncType::AllNotesOff || func.value <= 0.0 {
            return;
        }
        let released = self.output.release_all();
        log::info!(target: "daw", "all notes off (from {}): {} released", source, released);
    }
}

pub fn daw_manager(realtime: bool) -> (ManagerRuntime<DawHandler>, DawOutput) {
    let output = DawOutput::default();
    let handler = DawHandler {
        output: output.clone(),
    };
    (ManagerRuntime::new(EventSource::Daw, realtime, handler), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{EventRouter, Manager};
    use cadence_types::{Event, EventKind, MidiEventKind};
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        true
    }

    #[test]
    fn direct_calls_are_counted() {
        let output = DawOutput::default();
        output.process_midi_event_direct(MidiEvent::note_on(0, 60, 100));
        output.process_midi_event_direct(MidiEvent::note_on(0, 60, 0));
        output.process_midi_event_direct(MidiEvent::new(
            0,
            MidiEventKind::ControlChange { channel: 0, controller: 7, value: 100 },
        ));
        assert_eq!(output.counters().note_ons(), 1);
        assert_eq!(output.counters().note_offs(), 1);
        assert_eq!(output.counters().other(), 1);
    }

    #[test]
    fn routed_notes_reach_the_counters() {
        let router = EventRouter::new();
        let (mut daw, output) = daw_manager(false);
        router.register_listener(EventSource::MidiDevice, EventKind::MidiNote, &daw.mailbox());
        assert!(daw.start());
        router.publish(Event::midi_note(EventSource::MidiDevice, MidiEvent::note_on(0, 64, 80)));

        assert!(wait_until(|| output.counters().note_ons() == 1));
        assert_eq!(output.sounding(), 1);
        daw.stop();
    }

    #[test]
    fn voices_follow_note_on_and_off() {
        let output = DawOutput::default();
        output.process_midi_event_direct(MidiEvent::note_on(0, 60, 100));
        output.process_midi_event_direct(MidiEvent::note_on(0, 60, 110));
        output.process_midi_event_direct(MidiEvent::note_on(1, 60, 100));
        assert_eq!(output.sounding(), 2);
        output.process_midi_event_direct(MidiEvent::note_off(0, 60));
        assert_eq!(output.sounding(), 1);
        output.process_midi_event_direct(MidiEvent::note_on(1, 60, 0));
        assert_eq!(output.sounding(), 0);
    }

    #[test]
    fn all_notes_off_releases_sounding_voices() {
        let router = EventRouter::new();
        let (mut daw, output) = daw_manager(false);
        router.register_listener(EventSource::SurfaceControl, EventKind::SystemFunc, &daw.mailbox());
        assert!(daw.start());
        output.process_midi_event_direct(MidiEvent::note_on(0, 60, 100));
        output.process_midi_event_direct(MidiEvent::note_on(0, 67, 100));

        router.publish(Event::system_func(
            EventSource::SurfaceControl,
            SystemFunc::new(SystemFuncType::AllNotesOff),
        ));
        assert!(wait_until(|| output.sounding() == 0));
        assert_eq!(output.counters().note_offs(), 2);

        // Other system functions leave voices alone.
        output.process_midi_event_direct(MidiEvent::note_on(0, 72, 100));
        router.publish(Event::system_func(
            EventSource::SurfaceControl,
            SystemFunc::new(SystemFuncType::SavePreset),
        ));
        daw.stop();
        assert_eq!(output.sounding(), 1);
    }
}
