use serde::{Deserialize, Serialize};

/// MIDI clock resolution: pulses per quarter note.
pub const MIDI_CLOCK_PPQN: u32 = 24;

/// Note-selection policy of the arpeggiator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArpDirection {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
    /// Insertion order, regardless of pitch.
    Assigned,
}

impl ArpDirection {
    pub const ALL: [ArpDirection; 5] = [
        ArpDirection::Up,
        ArpDirection::Down,
        ArpDirection::UpDown,
        ArpDirection::Random,
        ArpDirection::Assigned,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArpDirection::Up => "Up",
            ArpDirection::Down => "Down",
            ArpDirection::UpDown => "Up/Down",
            ArpDirection::Random => "Random",
            ArpDirection::Assigned => "Assigned",
        }
    }

    /// Parameter position (0-based) of this mode.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|d| d == self).unwrap_or(0)
    }

    /// Out-of-range positions clamp to the last mode.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "up" => Some(ArpDirection::Up),
            "down" => Some(ArpDirection::Down),
            "up/down" | "updown" | "up_down" => Some(ArpDirection::UpDown),
            "random" => Some(ArpDirection::Random),
            "assigned" | "order" => Some(ArpDirection::Assigned),
            _ => None,
        }
    }
}

/// Musical length of one arpeggiated note (one note-on plus its note-off).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteDuration {
    Whole,
    Half,
    Quarter,
    QuarterTriplet,
    #[default]
    Eighth,
    EighthTriplet,
    Sixteenth,
    SixteenthTriplet,
    ThirtySecond,
}

impl NoteDuration {
    pub const ALL: [NoteDuration; 9] = [
        NoteDuration::Whole,
        NoteDuration::Half,
        NoteDuration::Quarter,
        NoteDuration::QuarterTriplet,
        NoteDuration::Eighth,
        NoteDuration::EighthTriplet,
        NoteDuration::Sixteenth,
        NoteDuration::SixteenthTriplet,
        NoteDuration::ThirtySecond,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NoteDuration::Whole => "1/1",
            NoteDuration::Half => "1/2",
            NoteDuration::Quarter => "1/4",
            NoteDuration::QuarterTriplet => "1/4T",
            NoteDuration::Eighth => "1/8",
            NoteDuration::EighthTriplet => "1/8T",
            NoteDuration::Sixteenth => "1/16",
            NoteDuration::SixteenthTriplet => "1/16T",
            NoteDuration::ThirtySecond => "1/32",
        }
    }

    /// Length in MIDI clock pulses at 24 PPQN.
    pub fn clock_pulses(&self) -> u32 {
        match self {
            NoteDuration::Whole => MIDI_CLOCK_PPQN * 4,
            NoteDuration::Half => MIDI_CLOCK_PPQN * 2,
            NoteDuration::Quarter => MIDI_CLOCK_PPQN,
            NoteDuration::QuarterTriplet => MIDI_CLOCK_PPQN * 2 / 3,
            NoteDuration::Eighth => MIDI_CLOCK_PPQN / 2,
            NoteDuration::EighthTriplet => MIDI_CLOCK_PPQN / 3,
            NoteDuration::Sixteenth => MIDI_CLOCK_PPQN / 4,
            NoteDuration::SixteenthTriplet => MIDI_CLOCK_PPQN / 6,
            NoteDuration::ThirtySecond => MIDI_CLOCK_PPQN / 8,
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|d| d == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(name.trim()))
    }
}
