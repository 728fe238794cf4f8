//! Arpeggiator behaviour: note ingest, the tempo-driven FSM and mode changes.
//!
//! Everything here runs with the arpeggiator mutex held. Output goes to the
//! downstream sink synchronously.

use cadence_core::MidiSink;
use cadence_types::{paths, ArpDirection, MidiEvent, MidiEventKind, NoteDuration, ParamValue};

use crate::arp_state::{on_phase_pulses, ArpFsmState, ArpState};

impl ArpState {
    /// Ingest one raw MIDI event from the upstream router. Returns true when
    /// the tempo thread has pulses to run.
    pub fn process_midi(&mut self, event: MidiEvent, sink: &dyn MidiSink) -> bool {
        match event.kind {
            MidiEventKind::Clock => {
                if self.midi_clock_in {
                    self.pending_pulses = self.pending_pulses.saturating_add(1);
                    return true;
                }
            }
            MidiEventKind::Start if self.midi_clock_in => self.transport_start(true, sink),
            MidiEventKind::Continue if self.midi_clock_in => self.transport_start(false, sink),
            MidiEventKind::Stop if self.midi_clock_in => self.transport_stop(sink),
            MidiEventKind::Start | MidiEventKind::Continue | MidiEventKind::Stop => {}
            MidiEventKind::NoteOn { .. } | MidiEventKind::NoteOff { .. }
                if self.matches_channel(&event) || self.releases_tracked_note(&event) =>
            {
                if self.enabled {
                    self.ingest_enabled(event, sink);
                } else {
                    self.ingest_disabled(event, sink);
                }
            }
            _ => sink.process_midi_event_direct(event),
        }
        false
    }

    fn matches_channel(&self, event: &MidiEvent) -> bool {
        self.channel_filter == 0 || event.channel() == Some(self.channel_filter - 1)
    }

    /// A note-off for a pitch already in either pool is ingested whatever the
    /// channel filter says, so a filter change never strands a released key.
    fn releases_tracked_note(&self, event: &MidiEvent) -> bool {
        if !event.is_note_off() {
            return false;
        }
        event.note().is_some_and(|note| {
            self.contains_arp_note(note) || self.held_notes.iter().any(|h| h.note() == Some(note))
        })
    }

    /// Disabled: pass notes through, tracking them so they join the
    /// arpeggio once enabled.
    fn ingest_disabled(&mut self, event: MidiEvent, sink: &dyn MidiSink) {
        let Some(note) = event.note() else {
            return;
        };
        if event.is_note_on() {
            self.add_held_note(event);
            self.add_arp_note(event);
        } else {
            self.remove_held_note(note);
            self.remove_arp_note(note);
        }
        sink.process_midi_event_direct(event);
    }

    fn ingest_enabled(&mut self, event: MidiEvent, sink: &dyn MidiSink) {
        let Some(note) = event.note() else {
            return;
        };

        if event.is_note_off() {
            self.remove_held_note(note);
            if self.held_notes.is_empty() {
                self.hold_reset = true;
            }
            if !self.hold {
                if self.remove_arp_note(note) {
                    if self.arp_notes.is_empty() {
                        self.step_now(false, sink);
                    }
                } else if let Some(off) = event.to_note_off() {
                    // Held before the arpeggiator was enabled.
                    sink.process_midi_event_direct(off);
                }
            } else if !self.contains_arp_note(note) {
                if let Some(off) = event.to_note_off() {
                    sink.process_midi_event_direct(off);
                }
            }
            return;
        }

        self.add_held_note(event);
        if self.hold && self.hold_reset {
            // Every key was released: a fresh held phrase begins.
            self.arp_notes.clear();
        }
        self.add_arp_note(event);
        if self.fsm_state == ArpFsmState::Idle && self.started {
            self.step_now(true, sink);
        }
        self.hold_reset = self.held_notes.is_empty();
    }

    /// Run the FSM right away instead of waiting for the next pulse.
    fn step_now(&mut self, reset_pulses: bool, sink: &dyn MidiSink) {
        if reset_pulses {
            self.reset_pulse_counter();
        }
        self.step(sink);
    }

    /// One FSM transition.
    pub fn step(&mut self, sink: &dyn MidiSink) {
        match self.fsm_state {
            ArpFsmState::Disabled => {}
            ArpFsmState::Idle => {
                if !self.arp_notes.is_empty() {
                    self.reset_selection();
                    self.emit_next_note_on(sink);
                }
            }
            ArpFsmState::PlayingNoteOn => {
                self.emit_note_off(sink);
                self.fsm_state = if self.arp_notes.is_empty() {
                    ArpFsmState::Idle
                } else {
                    ArpFsmState::PlayingNoteOff
                };
            }
            ArpFsmState::PlayingNoteOff => {
                if self.arp_notes.is_empty() {
                    self.fsm_state = ArpFsmState::Idle;
                } else {
                    self.emit_next_note_on(sink);
                }
            }
        }
    }

    fn emit_next_note_on(&mut self, sink: &dyn MidiSink) {
        match self.select_next_note() {
            Some(note_on) => {
                sink.process_midi_event_direct(note_on);
                self.last_note = note_on.note();
                self.sounding = Some(note_on);
                self.fsm_state = ArpFsmState::PlayingNoteOn;
            }
            None => self.fsm_state = ArpFsmState::Idle,
        }
    }

    fn emit_note_off(&mut self, sink: &dyn MidiSink) {
        if let Some(off) = self.sounding.take().and_then(|n| n.to_note_off()) {
            sink.process_midi_event_direct(off);
        }
    }

    /// One clock pulse. Runs an FSM step when the current phase has elapsed,
    /// then alternates between the note-on and note-off phase lengths.
    pub fn tempo_pulse(&mut self, sink: &dyn MidiSink) {
        if !self.enabled || !self.started {
            return;
        }
        self.pulse_count += 1;
        if self.pulse_count >= self.note_duration_pulse_count {
            self.pulse_count = 0;
            self.step(sink);
            self.note_duration_pulse_count = self
                .tempo_pulse_count
                .saturating_sub(self.note_duration_pulse_count)
                .max(1);
        }
    }

    /// Run every pulse queued by the ingest path.
    pub fn drain_pending_pulses(&mut self, sink: &dyn MidiSink) {
        while self.pending_pulses > 0 {
            self.pending_pulses -= 1;
            self.tempo_pulse(sink);
        }
    }

    /// Silence the arpeggiator output and return to Idle (or stay Disabled).
    fn flush(&mut self, sink: &dyn MidiSink) {
        self.emit_note_off(sink);
        if self.enabled {
            self.fsm_state = ArpFsmState::Idle;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool, sink: &dyn MidiSink) {
        if self.enabled == enabled {
            return;
        }
        log::debug!(target: "arp", "enabled: {}", enabled);
        if enabled {
            // Tracked notes were passed through while disabled; silence them
            // before they are arpeggiated.
            for note in &self.arp_notes {
                if let Some(off) = note.to_note_off() {
                    sink.process_midi_event_direct(off);
                }
            }
            self.enabled = true;
            self.fsm_state = ArpFsmState::Idle;
            self.hold_reset = self.held_notes.is_empty();
            if self.started && !self.arp_notes.is_empty() {
                self.step_now(true, sink);
            }
        } else {
            if self.fsm_state == ArpFsmState::PlayingNoteOn {
                self.emit_note_off(sink);
            }
            self.sounding = None;
            self.enabled = false;
            self.fsm_state = ArpFsmState::Disabled;
            self.arp_notes.clear();
            self.reset_selection();
        }
    }

    pub fn set_hold(&mut self, hold: bool, sink: &dyn MidiSink) {
        if self.hold == hold {
            return;
        }
        self.hold = hold;
        if hold {
            self.hold_reset = self.held_notes.is_empty();
            return;
        }
        // Releasing hold keeps only the keys still down.
        let held = &self.held_notes;
        self.arp_notes
            .retain(|n| held.iter().any(|h| h.note() == n.note()));
        if self.enabled && self.arp_notes.is_empty() {
            self.step_now(false, sink);
        }
    }

    pub fn set_direction(&mut self, direction: ArpDirection) {
        if self.direction_mode != direction {
            self.direction_mode = direction;
            self.updown_going_up = true;
            self.step = 0;
            self.shuffle_order.clear();
        }
    }

    pub fn set_note_duration(&mut self, duration: NoteDuration) {
        self.note_duration = duration;
        self.tempo_pulse_count = duration.clock_pulses();
        let on = on_phase_pulses(self.tempo_pulse_count);
        let phase = if self.fsm_state == ArpFsmState::PlayingNoteOn {
            on
        } else {
            self.tempo_pulse_count.saturating_sub(on)
        };
        self.note_duration_pulse_count = phase.max(1);
        self.pulse_count = self.pulse_count.min(self.note_duration_pulse_count - 1);
    }

    pub fn set_tempo_bpm(&mut self, bpm: f32) {
        self.tempo_bpm = bpm.clamp(
            cadence_core::config::MIN_TEMPO_BPM,
            cadence_core::config::MAX_TEMPO_BPM,
        );
    }

    pub fn set_channel_filter(&mut self, channel: u8) {
        self.channel_filter = channel.min(16);
    }

    /// Switch the clock source. Following an external clock waits for a
    /// MIDI start; the internal clock follows the run parameter.
    pub fn set_midi_clock_in(&mut self, midi_clock_in: bool, sink: &dyn MidiSink) {
        if self.midi_clock_in == midi_clock_in {
            return;
        }
        self.midi_clock_in = midi_clock_in;
        self.pending_pulses = 0;
        if midi_clock_in {
            self.transport_stop(sink);
        } else if self.run {
            self.transport_start(true, sink);
        } else {
            self.transport_stop(sink);
        }
    }

    pub fn set_run(&mut self, run: bool, sink: &dyn MidiSink) {
        self.run = run;
        if self.midi_clock_in {
            return;
        }
        if run && !self.started {
            self.transport_start(true, sink);
        } else if !run && self.started {
            self.transport_stop(sink);
        }
    }

    /// Transport start or continue. A start always re-enters cleanly from Idle.
    pub fn transport_start(&mut self, restart: bool, sink: &dyn MidiSink) {
        if self.started && !restart {
            return;
        }
        self.started = true;
        self.pending_pulses = 0;
        if !self.enabled {
            return;
        }
        self.flush(sink);
        if !self.arp_notes.is_empty() {
            self.step_now(true, sink);
        }
    }

    pub fn transport_stop(&mut self, sink: &dyn MidiSink) {
        self.started = false;
        self.pending_pulses = 0;
        self.flush(sink);
    }

    /// Panic: silence everything this arpeggiator may have left sounding.
    pub fn all_notes_off(&mut self, sink: &dyn MidiSink) {
        self.emit_note_off(sink);
        if !self.enabled {
            for note in &self.arp_notes {
                if let Some(off) = note.to_note_off() {
                    sink.process_midi_event_direct(off);
                }
            }
        }
        self.arp_notes.clear();
        self.held_notes.clear();
        self.hold_reset = true;
        self.reset_selection();
        if self.enabled {
            self.fsm_state = ArpFsmState::Idle;
        }
    }

    /// Apply a parameter owned by or relevant to the arpeggiator. Returns
    /// false for paths it does not consume.
    pub fn apply_param(&mut self, path: &str, value: &ParamValue, sink: &dyn MidiSink) -> bool {
        match path {
            paths::ARP_ENABLE => self.set_enabled(value.as_bool(), sink),
            paths::ARP_DIRECTION => self.set_direction(ArpDirection::from_index(value.as_index())),
            paths::ARP_NOTE_DURATION => {
                self.set_note_duration(NoteDuration::from_index(value.as_index()))
            }
            paths::ARP_HOLD => self.set_hold(value.as_bool(), sink),
            paths::ARP_RUN => self.set_run(value.as_bool(), sink),
            paths::MIDI_CLOCK_IN => self.set_midi_clock_in(value.as_bool(), sink),
            paths::TEMPO_BPM => self.set_tempo_bpm(value.to_f32()),
            paths::LAYER_1_MIDI_CHANNEL => self.set_channel_filter(value.as_index().min(16) as u8),
            _ => return false,
        }
        true
    }
}
