use serde::{Deserialize, Serialize};

/// Raw MIDI event record with a timestamp for scheduling.
/// Timestamp is in microseconds from a driver-specific epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Event timestamp in microseconds (driver-specific epoch)
    pub timestamp_us: u64,
    /// The actual MIDI event data
    pub kind: MidiEventKind,
}

/// The specific type of MIDI event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    PitchBend {
        channel: u8,
        /// Pitch bend value: -8192 (full down) to +8191 (full up), 0 = center
        value: i16,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    Aftertouch {
        channel: u8,
        pressure: u8,
    },
    PolyAftertouch {
        channel: u8,
        note: u8,
        pressure: u8,
    },
    /// System real-time: one clock tick (24 per quarter note)
    Clock,
    Start,
    Continue,
    Stop,
}

impl MidiEvent {
    /// Create a new MidiEvent with timestamp
    pub fn new(timestamp_us: u64, kind: MidiEventKind) -> Self {
        Self { timestamp_us, kind }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(0, MidiEventKind::NoteOn { channel, note, velocity })
    }

    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::new(0, MidiEventKind::NoteOff { channel, note })
    }

    /// Parse a raw MIDI message. Channels are returned zero-based (0..=15).
    /// Returns `None` for sysex, running status, or truncated messages.
    pub fn from_bytes(timestamp_us: u64, bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        let data = |i: usize| bytes.get(i).copied().map(|b| b & 0x7F);
        let channel = status & 0x0F;
        let kind = match status {
            0xF8 => MidiEventKind::Clock,
            0xFA => MidiEventKind::Start,
            0xFB => MidiEventKind::Continue,
            0xFC => MidiEventKind::Stop,
            0x80..=0x8F => MidiEventKind::NoteOff { channel, note: data(1)? },
            0x90..=0x9F => MidiEventKind::NoteOn {
                channel,
                note: data(1)?,
                velocity: data(2)?,
            },
            0xA0..=0xAF => MidiEventKind::PolyAftertouch {
                channel,
                note: data(1)?,
                pressure: data(2)?,
            },
            0xB0..=0xBF => MidiEventKind::ControlChange {
                channel,
                controller: data(1)?,
                value: data(2)?,
            },
            0xC0..=0xCF => MidiEventKind::ProgramChange { channel, program: data(1)? },
            0xD0..=0xDF => MidiEventKind::Aftertouch { channel, pressure: data(1)? },
            0xE0..=0xEF => {
                let raw = (data(1)? as i16) | ((data(2)? as i16) << 7);
                MidiEventKind::PitchBend { channel, value: raw - 8192 }
            }
            _ => return None,
        };
        Some(Self::new(timestamp_us, kind))
    }

    /// Note-on with non-zero velocity.
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, MidiEventKind::NoteOn { velocity, .. } if velocity > 0)
    }

    /// Note-off, or note-on with zero velocity.
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.kind,
            MidiEventKind::NoteOff { .. } | MidiEventKind::NoteOn { velocity: 0, .. }
        )
    }

    pub fn is_note(&self) -> bool {
        matches!(
            self.kind,
            MidiEventKind::NoteOn { .. } | MidiEventKind::NoteOff { .. }
        )
    }

    pub fn note(&self) -> Option<u8> {
        match self.kind {
            MidiEventKind::NoteOn { note, .. }
            | MidiEventKind::NoteOff { note, .. }
            | MidiEventKind::PolyAftertouch { note, .. } => Some(note),
            _ => None,
        }
    }

    /// Zero-based channel for channel-voice messages, `None` for system real-time.
    pub fn channel(&self) -> Option<u8> {
        match self.kind {
            MidiEventKind::NoteOn { channel, .. }
            | MidiEventKind::NoteOff { channel, .. }
            | MidiEventKind::ControlChange { channel, .. }
            | MidiEventKind::PitchBend { channel, .. }
            | MidiEventKind::ProgramChange { channel, .. }
            | MidiEventKind::Aftertouch { channel, .. }
            | MidiEventKind::PolyAftertouch { channel, .. } => Some(channel),
            MidiEventKind::Clock
            | MidiEventKind::Start
            | MidiEventKind::Continue
            | MidiEventKind::Stop => None,
        }
    }

    /// The note-off that silences this note, keeping channel and timestamp.
    pub fn to_note_off(&self) -> Option<Self> {
        match self.kind {
            MidiEventKind::NoteOn { channel, note, .. } | MidiEventKind::NoteOff { channel, note } => {
                Some(Self::new(self.timestamp_us, MidiEventKind::NoteOff { channel, note }))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_velocity_note_on_is_a_note_off() {
        let ev = MidiEvent::note_on(0, 60, 0);
        assert!(ev.is_note_off());
        assert!(!ev.is_note_on());
        assert!(MidiEvent::note_on(0, 60, 1).is_note_on());
    }

    #[test]
    fn parse_note_messages() {
        let on = MidiEvent::from_bytes(5, &[0x91, 64, 100]).unwrap();
        assert_eq!(on.kind, MidiEventKind::NoteOn { channel: 1, note: 64, velocity: 100 });
        assert_eq!(on.timestamp_us, 5);

        let off = MidiEvent::from_bytes(0, &[0x80, 64, 0]).unwrap();
        assert_eq!(off.kind, MidiEventKind::NoteOff { channel: 0, note: 64 });
    }

    #[test]
    fn parse_realtime_and_bend() {
        assert_eq!(MidiEvent::from_bytes(0, &[0xF8]).unwrap().kind, MidiEventKind::Clock);
        assert_eq!(MidiEvent::from_bytes(0, &[0xFA]).unwrap().kind, MidiEventKind::Start);
        assert_eq!(MidiEvent::from_bytes(0, &[0xFC]).unwrap().kind, MidiEventKind::Stop);

        let center = MidiEvent::from_bytes(0, &[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(center.kind, MidiEventKind::PitchBend { channel: 0, value: 0 });
    }

    #[test]
    fn truncated_or_unknown_messages_are_rejected() {
        assert!(MidiEvent::from_bytes(0, &[]).is_none());
        assert!(MidiEvent::from_bytes(0, &[0x90, 60]).is_none());
        assert!(MidiEvent::from_bytes(0, &[0xF0, 0x7E]).is_none());
    }

    #[test]
    fn to_note_off_keeps_channel() {
        let off = MidiEvent::note_on(3, 72, 90).to_note_off().unwrap();
        assert_eq!(off.kind, MidiEventKind::NoteOff { channel: 3, note: 72 });
        assert!(MidiEvent::new(0, MidiEventKind::Clock).to_note_off().is_none());
    }
}
