mod common;

use std::sync::Arc;
use std::time::Duration;

use cadence_arp::ArpFsmState;
use cadence_core::{EventRouter, Manager, MidiSink, ParamRegistry};
use cadence_types::{
    paths, ArpDirection, Event, EventSource, LayerMask, MidiEvent, MidiEventKind, ParamChange,
    ParamValue, SystemFunc, SystemFuncType,
};

use common::{enabled_arp, midi_clocked_registry, wait_until};

fn param(path: &str, value: ParamValue) -> ParamChange {
    ParamChange::new(path, value)
}

#[test]
fn test_disable_through_router_leaves_no_stuck_notes() {
    let registry = midi_clocked_registry();
    let router = Arc::new(EventRouter::new());
    let (mut arp, sink) = enabled_arp(&registry);
    arp.register_listeners(&router);
    assert!(arp.start());

    let input = arp.midi_input();
    input.process_midi_event_direct(MidiEvent::new(0, MidiEventKind::Start));
    input.process_midi_event_direct(MidiEvent::note_on(0, 60, 100));
    input.process_midi_event_direct(MidiEvent::note_on(0, 64, 100));
    assert_eq!(sink.note_ons(), vec![60]);

    let delivered = router.publish(Event::param_changed(
        EventSource::SurfaceControl,
        param(paths::ARP_ENABLE, ParamValue::Bool(false)),
    ));
    assert_eq!(delivered, 1);
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.fsm_state() == ArpFsmState::Disabled)
    }));
    sink.assert_no_stuck_notes();

    // Disabled: keys pass straight through.
    sink.clear();
    input.process_midi_event_direct(MidiEvent::note_on(0, 72, 90));
    assert_eq!(sink.events(), vec![MidiEvent::note_on(0, 72, 90)]);
    arp.stop();
}

#[test]
fn test_params_from_unsubscribed_source_are_not_delivered() {
    let registry = ParamRegistry::new();
    let router = EventRouter::new();
    let (mut arp, _sink) = enabled_arp(&registry);
    arp.register_listeners(&router);
    assert!(arp.start());

    let delivered = router.publish(Event::param_changed(
        EventSource::Daw,
        param(paths::ARP_DIRECTION, ParamValue::Int(2)),
    ));
    assert_eq!(delivered, 0);

    let delivered = router.publish(Event::param_changed(
        EventSource::Osc,
        param(paths::ARP_DIRECTION, ParamValue::Int(2)),
    ));
    assert_eq!(delivered, 1);
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.direction_mode() == ArpDirection::UpDown)
    }));
    arp.stop();
}

#[test]
fn test_out_of_range_param_is_coerced() {
    let registry = ParamRegistry::new();
    let router = EventRouter::new();
    let (mut arp, _sink) = enabled_arp(&registry);
    arp.register_listeners(&router);
    assert!(arp.start());

    router.publish(Event::param_changed(
        EventSource::Gui,
        param(paths::ARP_DIRECTION, ParamValue::Float(42.0)),
    ));
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.direction_mode() == ArpDirection::Assigned)
    }));
    arp.stop();
}

#[test]
fn test_layer_change_for_other_layers_is_ignored() {
    let registry = ParamRegistry::new();
    let (mut arp, _sink) = enabled_arp(&registry);
    assert!(arp.start());

    arp.post(Event::param_changed(
        EventSource::Gui,
        param(paths::LAYER_1_MIDI_CHANNEL, ParamValue::Int(5)).with_layers(LayerMask::layer(1)),
    ));
    // Same mailbox, so this lands after the masked change.
    arp.post(Event::param_changed(
        EventSource::Gui,
        param(paths::ARP_DIRECTION, ParamValue::Int(1)),
    ));
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.direction_mode() == ArpDirection::Down)
    }));
    assert_eq!(arp.with_state(|s| s.channel_filter()), 0);

    arp.post(Event::param_changed(
        EventSource::Gui,
        param(paths::LAYER_1_MIDI_CHANNEL, ParamValue::Int(3)).with_layers(LayerMask::layer(0)),
    ));
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.channel_filter() == 3)
    }));
    arp.stop();
}

#[test]
fn test_reload_presets_ignores_ab_toggle() {
    let registry = ParamRegistry::new();
    let router = EventRouter::new();
    let (mut arp, _sink) = enabled_arp(&registry);
    arp.register_listeners(&router);
    assert!(arp.start());

    // A patch load wrote new values without announcing them.
    registry.set(paths::ARP_DIRECTION, ParamValue::Int(1));

    router.publish(Event::reload_presets(EventSource::FileManager, true));
    router.publish(Event::param_changed(
        EventSource::FileManager,
        param(paths::ARP_HOLD, ParamValue::Bool(true)),
    ));
    // FIFO: once hold is applied the A/B reload has already been handled.
    assert!(wait_until(Duration::from_secs(2), || arp.with_state(|s| s.hold())));
    arp.with_state(|s| assert_eq!(s.direction_mode(), ArpDirection::Up));

    router.publish(Event::reload_presets(EventSource::FileManager, false));
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.direction_mode() == ArpDirection::Down)
    }));
    arp.stop();
}

#[test]
fn test_system_funcs_drive_transport_and_panic() {
    let registry = ParamRegistry::new();
    let router = EventRouter::new();
    let (mut arp, sink) = enabled_arp(&registry);
    arp.register_listeners(&router);
    assert!(arp.start());

    router.publish(Event::system_func(
        EventSource::SurfaceControl,
        SystemFunc::new(SystemFuncType::MidiClockStop),
    ));
    assert!(wait_until(Duration::from_secs(2), || arp.with_state(|s| !s.started())));

    arp.process_midi_event_direct(MidiEvent::note_on(0, 60, 100));
    assert!(sink.note_ons().is_empty());

    router.publish(Event::system_func(
        EventSource::SurfaceControl,
        SystemFunc::new(SystemFuncType::MidiClockStart),
    ));
    assert!(wait_until(Duration::from_secs(2), || sink.note_ons().first() == Some(&60)));

    router.publish(Event::system_func(
        EventSource::MidiDevice,
        SystemFunc::new(SystemFuncType::AllNotesOff),
    ));
    assert!(wait_until(Duration::from_secs(2), || {
        arp.with_state(|s| s.arp_notes().is_empty() && s.sounding().is_none())
    }));
    sink.assert_no_stuck_notes();
    arp.stop();
}

#[test]
fn test_post_applies_like_a_routed_event() {
    let registry = ParamRegistry::new();
    let (mut arp, _sink) = enabled_arp(&registry);
    assert!(arp.start());
    arp.post(Event::param_changed(
        EventSource::Gui,
        param(paths::LAYER_1_MIDI_CHANNEL, ParamValue::Int(3)),
    ));
    assert!(wait_until(Duration::from_secs(2), || arp.with_state(|s| s.channel_filter() == 3)));
    arp.stop();
}

#[test]
fn test_stop_from_another_thread() {
    let registry = ParamRegistry::new();
    let (mut arp, sink) = enabled_arp(&registry);
    assert!(arp.start());
    arp.process_midi_event_direct(MidiEvent::note_on(0, 60, 100));

    let handle = std::thread::spawn(move || {
        arp.stop();
        arp.is_running()
    });
    assert!(!handle.join().unwrap());
    sink.assert_no_stuck_notes();
}
