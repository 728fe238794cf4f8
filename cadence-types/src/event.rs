//! Bus event model.
//!
//! An [`Event`] pairs a source identity with exactly one payload variant. The
//! kind is derived from the payload, so a kind/payload mismatch cannot be
//! constructed. Events have no mutating methods; every subscriber receives its
//! own clone.

use serde::{Deserialize, Serialize};

use crate::{EventSource, MidiEvent, ParamValue};

/// Discriminant used for listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MidiNote,
    ParamChanged,
    SystemFunc,
    ReloadPresets,
    SurfaceControlFunc,
}

/// Bitmask of the sound layers a parameter change applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(0xFF);

    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Mask selecting a single zero-based layer. Layers above 7 yield an empty mask.
    pub fn layer(index: u8) -> Self {
        Self(1u8.checked_shl(index as u32).unwrap_or(0))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, index: u8) -> bool {
        !Self::layer(index).is_empty() && self.0 & Self::layer(index).0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamChange {
    pub path: String,
    pub value: ParamValue,
    pub layers: LayerMask,
}

impl ParamChange {
    pub fn new(path: &str, value: ParamValue) -> Self {
        Self {
            path: path.to_string(),
            value,
            layers: LayerMask::ALL,
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemFuncType {
    MidiClockStart,
    MidiClockContinue,
    MidiClockStop,
    AllNotesOff,
    ToggleAbState,
    SavePreset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemFunc {
    pub func: SystemFuncType,
    /// Pressed/released for momentary controls, 1.0 otherwise.
    pub value: f32,
}

impl SystemFunc {
    pub fn new(func: SystemFuncType) -> Self {
        Self { func, value: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceControlMode {
    Toggle,
    Momentary,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceControlFunc {
    pub mode: SurfaceControlMode,
    pub path: String,
    pub state: bool,
}

/// Kind-specific payload. One variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    MidiNote(MidiEvent),
    ParamChanged(ParamChange),
    SystemFunc(SystemFunc),
    ReloadPresets { from_ab_toggle: bool },
    SurfaceControlFunc(SurfaceControlFunc),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::MidiNote(_) => EventKind::MidiNote,
            EventPayload::ParamChanged(_) => EventKind::ParamChanged,
            EventPayload::SystemFunc(_) => EventKind::SystemFunc,
            EventPayload::ReloadPresets { .. } => EventKind::ReloadPresets,
            EventPayload::SurfaceControlFunc(_) => EventKind::SurfaceControlFunc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    source: EventSource,
    payload: EventPayload,
}

impl Event {
    pub fn new(source: EventSource, payload: EventPayload) -> Self {
        Self { source, payload }
    }

    pub fn midi_note(source: EventSource, midi: MidiEvent) -> Self {
        Self::new(source, EventPayload::MidiNote(midi))
    }

    pub fn param_changed(source: EventSource, change: ParamChange) -> Self {
        Self::new(source, EventPayload::ParamChanged(change))
    }

    pub fn system_func(source: EventSource, func: SystemFunc) -> Self {
        Self::new(source, EventPayload::SystemFunc(func))
    }

    pub fn reload_presets(source: EventSource, from_ab_toggle: bool) -> Self {
        Self::new(source, EventPayload::ReloadPresets { from_ab_toggle })
    }

    pub fn surface_control_func(source: EventSource, func: SurfaceControlFunc) -> Self {
        Self::new(source, EventPayload::SurfaceControlFunc(func))
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn into_payload(self) -> EventPayload {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_payload() {
        let ev = Event::param_changed(
            EventSource::Gui,
            ParamChange::new("arp/enable", ParamValue::Bool(true)),
        );
        assert_eq!(ev.kind(), EventKind::ParamChanged);
        assert_eq!(ev.source(), EventSource::Gui);

        let ev = Event::reload_presets(EventSource::FileManager, true);
        assert_eq!(ev.kind(), EventKind::ReloadPresets);
        assert_eq!(ev.payload(), &EventPayload::ReloadPresets { from_ab_toggle: true });

        let ev = Event::midi_note(EventSource::MidiDevice, MidiEvent::note_on(0, 60, 100));
        assert_eq!(ev.kind(), EventKind::MidiNote);
    }

    #[test]
    fn clones_are_independent() {
        let original = Event::param_changed(
            EventSource::Osc,
            ParamChange::new("system/tempo_bpm", ParamValue::Float(90.0)),
        );
        let copy = original.clone();
        let EventPayload::ParamChanged(mut change) = copy.into_payload() else {
            panic!("expected ParamChanged");
        };
        change.value = ParamValue::Float(140.0);
        match original.payload() {
            EventPayload::ParamChanged(c) => assert_eq!(c.value, ParamValue::Float(90.0)),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn layer_mask_bits() {
        let mask = LayerMask::new(0b0000_0101);
        assert!(mask.contains(0));
        assert!(!mask.contains(1));
        assert!(mask.contains(2));
        assert!(LayerMask::layer(9).is_empty());
        assert!(!LayerMask::ALL.contains(9));
        assert!(LayerMask::NONE.is_empty());
    }
}
