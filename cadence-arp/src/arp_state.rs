use cadence_types::{ArpDirection, MidiEvent, NoteDuration, MIDI_CLOCK_PPQN};

/// Capacity of the arpeggiation pool. Notes beyond it are dropped.
pub const MAX_ARP_NOTES: usize = 16;

/// Upper bound on tracked physical keys.
pub(crate) const MAX_HELD_NOTES: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpFsmState {
    Disabled,
    Idle,
    PlayingNoteOn,
    PlayingNoteOff,
}

/// Arpeggiator state. Owned by the arpeggiator manager and only ever
/// mutated while its mutex is held.
#[derive(Debug, Clone)]
pub struct ArpState {
    pub(crate) enabled: bool,
    pub(crate) hold: bool,
    /// Transport running (MIDI start received, or the run param when clocked internally).
    pub(crate) started: bool,
    pub(crate) run: bool,
    pub(crate) midi_clock_in: bool,
    pub(crate) direction_mode: ArpDirection,
    pub(crate) note_duration: NoteDuration,
    /// Primary layer MIDI channel filter: 0 = omni, 1..=16.
    pub(crate) channel_filter: u8,
    pub(crate) tempo_bpm: f32,

    pub(crate) held_notes: Vec<MidiEvent>,
    pub(crate) arp_notes: Vec<MidiEvent>,
    pub(crate) hold_reset: bool,

    pub(crate) fsm_state: ArpFsmState,
    pub(crate) step: usize,
    pub(crate) shuffle_order: Vec<usize>,
    pub(crate) updown_going_up: bool,
    /// Pitch of the last emitted note-on, kept after its note-off.
    pub(crate) last_note: Option<u8>,
    /// Emitted note-on still waiting for its note-off.
    pub(crate) sounding: Option<MidiEvent>,
    pub(crate) rng_state: u64,

    pub(crate) tempo_pulse_count: u32,
    pub(crate) note_duration_pulse_count: u32,
    pub(crate) pulse_count: u32,

    /// Clock pulses received on the ingest path, not yet run by the tempo thread.
    pub(crate) pending_pulses: u32,
    pub(crate) exit: bool,
}

impl Default for ArpState {
    fn default() -> Self {
        let note_duration = NoteDuration::default();
        let tempo_pulse_count = note_duration.clock_pulses();
        Self {
            enabled: false,
            hold: false,
            started: true,
            run: true,
            midi_clock_in: false,
            direction_mode: ArpDirection::default(),
            note_duration,
            channel_filter: 0,
            tempo_bpm: 120.0,
            held_notes: Vec::new(),
            arp_notes: Vec::with_capacity(MAX_ARP_NOTES),
            hold_reset: true,
            fsm_state: ArpFsmState::Disabled,
            step: 0,
            shuffle_order: Vec::with_capacity(MAX_ARP_NOTES),
            updown_going_up: true,
            last_note: None,
            sounding: None,
            rng_state: 12345,
            tempo_pulse_count,
            note_duration_pulse_count: on_phase_pulses(tempo_pulse_count),
            pulse_count: 0,
            pending_pulses: 0,
            exit: false,
        }
    }
}

impl ArpState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_rng(&mut self, seed: u64) {
        // Zero would make the LCG degenerate for the first few draws.
        self.rng_state = seed | 1;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn hold(&self) -> bool {
        self.hold
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn midi_clock_in(&self) -> bool {
        self.midi_clock_in
    }

    pub fn direction_mode(&self) -> ArpDirection {
        self.direction_mode
    }

    pub fn note_duration(&self) -> NoteDuration {
        self.note_duration
    }

    pub fn channel_filter(&self) -> u8 {
        self.channel_filter
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    pub fn fsm_state(&self) -> ArpFsmState {
        self.fsm_state
    }

    pub fn held_notes(&self) -> &[MidiEvent] {
        &self.held_notes
    }

    pub fn arp_notes(&self) -> &[MidiEvent] {
        &self.arp_notes
    }

    pub fn sounding(&self) -> Option<MidiEvent> {
        self.sounding
    }

    pub fn tempo_pulse_count(&self) -> u32 {
        self.tempo_pulse_count
    }

    pub fn note_duration_pulse_count(&self) -> u32 {
        self.note_duration_pulse_count
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    /// Interval between internally generated clock pulses.
    pub fn internal_pulse_period(&self) -> std::time::Duration {
        let bpm = self.tempo_bpm.max(1.0) as f64;
        std::time::Duration::from_secs_f64(60.0 / (bpm * MIDI_CLOCK_PPQN as f64))
    }

    pub(crate) fn contains_arp_note(&self, note: u8) -> bool {
        self.arp_notes.iter().any(|n| n.note() == Some(note))
    }

    /// Add to the pool. Duplicates and overflow are dropped silently.
    pub(crate) fn add_arp_note(&mut self, event: MidiEvent) -> bool {
        let Some(note) = event.note() else {
            return false;
        };
        if self.contains_arp_note(note) {
            return false;
        }
        if self.arp_notes.len() >= MAX_ARP_NOTES {
            log::debug!(target: "arp", "note pool full, dropping note {}", note);
            return false;
        }
        self.arp_notes.push(event);
        true
    }

    pub(crate) fn remove_arp_note(&mut self, note: u8) -> bool {
        let before = self.arp_notes.len();
        self.arp_notes.retain(|n| n.note() != Some(note));
        before != self.arp_notes.len()
    }

    pub(crate) fn add_held_note(&mut self, event: MidiEvent) {
        let Some(note) = event.note() else {
            return;
        };
        if self.held_notes.iter().any(|n| n.note() == Some(note)) {
            return;
        }
        if self.held_notes.len() < MAX_HELD_NOTES {
            self.held_notes.push(event);
        }
    }

    pub(crate) fn remove_held_note(&mut self, note: u8) -> bool {
        let before = self.held_notes.len();
        self.held_notes.retain(|n| n.note() != Some(note));
        before != self.held_notes.len()
    }

    /// Restart pulse counting at the beginning of a note-on phase.
    pub(crate) fn reset_pulse_counter(&mut self) {
        self.pulse_count = 0;
        self.note_duration_pulse_count = on_phase_pulses(self.tempo_pulse_count);
    }
}

/// Pulses in the note-on half of a note period. The on half takes the extra
/// pulse when the period is odd.
pub(crate) fn on_phase_pulses(tempo_pulse_count: u32) -> u32 {
    tempo_pulse_count.div_ceil(2).max(1)
}
