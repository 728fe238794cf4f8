//! Well-known parameter paths.

pub const ARP_ENABLE: &str = "arp/enable";
pub const ARP_DIRECTION: &str = "arp/direction";
pub const ARP_NOTE_DURATION: &str = "arp/note_duration";
pub const ARP_HOLD: &str = "arp/hold";
pub const ARP_RUN: &str = "arp/run";

pub const MIDI_CLOCK_IN: &str = "system/midi_clock_in";
pub const TEMPO_BPM: &str = "system/tempo_bpm";

/// Prefix shared by every parameter of the primary sound layer.
pub const LAYER_1_PREFIX: &str = "layer_1/";

/// MIDI channel filter of the primary layer: 0 = omni, 1..=16 otherwise.
pub const LAYER_1_MIDI_CHANNEL: &str = "layer_1/midi_channel";

/// Parameters owned by the arpeggiator.
pub const ARP_PARAMS: [&str; 5] = [ARP_ENABLE, ARP_DIRECTION, ARP_NOTE_DURATION, ARP_HOLD, ARP_RUN];
