//! # cadence-arp
//!
//! Tempo-synced arpeggiator built on the cadence manager runtime.
//!
//! Raw notes arrive on the direct ingest path ([`ArpInput`]), parameter and
//! preset events arrive through the bus, and a dedicated tempo thread steps
//! the note FSM once its pulse count elapses. Output goes straight to a
//! downstream [`cadence_core::MidiSink`].
//!
//! ## Module Overview
//!
//! - [`arp_state`] - `ArpState`: pools, mode flags, FSM state and pulse counters
//! - `engine` - ingest, FSM steps, tempo pulses and mode setters on `ArpState`
//! - `note_select` - direction-mode note selection
//! - [`manager`] - `ArpeggiatorManager`: bus listener, tempo thread, lifecycle

pub mod arp_state;
mod engine;
pub mod manager;
mod note_select;

pub use arp_state::{ArpFsmState, ArpState, MAX_ARP_NOTES};
pub use manager::{ArpInput, ArpeggiatorManager};
