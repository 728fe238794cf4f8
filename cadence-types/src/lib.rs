//! # cadence-types
//!
//! Shared type definitions for the cadence control plane.
//! This crate contains the event model, the raw MIDI record and the
//! parameter values carried between cadence-core, cadence-arp and the binary.

mod arp;
mod event;
mod midi;
mod param;
pub mod paths;

pub use arp::{ArpDirection, NoteDuration, MIDI_CLOCK_PPQN};
pub use event::{
    Event, EventKind, EventPayload, LayerMask, ParamChange, SurfaceControlFunc,
    SurfaceControlMode, SystemFunc, SystemFuncType,
};
pub use midi::{MidiEvent, MidiEventKind};
pub use param::{ParamSpec, ParamValue};

/// Identity of a subsystem that can publish or subscribe to events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum EventSource {
    SurfaceControl,
    MidiDevice,
    FileManager,
    Gui,
    Osc,
    Daw,
    Arpeggiator,
    SoftwareUpdate,
    System,
}

impl EventSource {
    pub const ALL: [EventSource; 9] = [
        EventSource::SurfaceControl,
        EventSource::MidiDevice,
        EventSource::FileManager,
        EventSource::Gui,
        EventSource::Osc,
        EventSource::Daw,
        EventSource::Arpeggiator,
        EventSource::SoftwareUpdate,
        EventSource::System,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventSource::SurfaceControl => "surface",
            EventSource::MidiDevice => "midi",
            EventSource::FileManager => "file",
            EventSource::Gui => "gui",
            EventSource::Osc => "osc",
            EventSource::Daw => "daw",
            EventSource::Arpeggiator => "arp",
            EventSource::SoftwareUpdate => "swupdate",
            EventSource::System => "system",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_are_unique() {
        let mut names: Vec<&str> = EventSource::ALL.iter().map(|s| s.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EventSource::ALL.len());
    }

    #[test]
    fn source_display_matches_name() {
        assert_eq!(EventSource::FileManager.to_string(), "file");
        assert_eq!(EventSource::SurfaceControl.to_string(), "surface");
    }
}
