//! Direct MIDI delivery between managers, bypassing router and mailboxes.

use std::sync::Arc;

use crossbeam_channel::Sender;

use cadence_types::MidiEvent;

/// Receiver of latency-critical MIDI. Called synchronously on the caller's
/// thread, so implementations must not block for long.
pub trait MidiSink: Send + Sync {
    fn process_midi_event_direct(&self, event: MidiEvent);
}

impl<T: MidiSink + ?Sized> MidiSink for Arc<T> {
    fn process_midi_event_direct(&self, event: MidiEvent) {
        (**self).process_midi_event_direct(event)
    }
}

/// Forwards MIDI onto a channel, for sinks that drain on their own thread.
impl MidiSink for Sender<MidiEvent> {
    fn process_midi_event_direct(&self, event: MidiEvent) {
        if self.send(event).is_err() {
            log::debug!(target: "manager", "midi sink disconnected, dropping {:?}", event.kind);
        }
    }
}
