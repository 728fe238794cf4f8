//! Bus-facing arpeggiator manager and its tempo thread.
//!
//! Three threads touch [`ArpState`]: the upstream MIDI router (direct
//! ingest), the manager's dispatch thread (parameter and preset events) and
//! the tempo thread. All of them go through the single mutex in
//! [`ArpShared`].

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use cadence_core::config::ArpDefaults;
use cadence_core::manager::raise_priority;
use cadence_core::params::{is_arp_param, is_layer_1_param, is_midi_clock_in};
use cadence_core::{EventHandler, EventRouter, Mailbox, Manager, ManagerRuntime, MidiSink, ParamRegistry};
use cadence_types::{
    paths, Event, EventKind, EventSource, MidiEvent, ParamChange, ParamSpec, SystemFunc,
    SystemFuncType,
};

use crate::arp_state::ArpState;

/// Sources whose parameter, preset and system events reach the arpeggiator.
pub const SUBSCRIBED_SOURCES: [EventSource; 5] = [
    EventSource::SurfaceControl,
    EventSource::FileManager,
    EventSource::Gui,
    EventSource::Osc,
    EventSource::MidiDevice,
];

const SUBSCRIBED_KINDS: [EventKind; 3] = [
    EventKind::ParamChanged,
    EventKind::ReloadPresets,
    EventKind::SystemFunc,
];

/// Parameters applied on start and on preset reload, in dependency order:
/// the clock source before the run flag it gates.
const LOADED_PARAMS: [&str; 8] = [
    paths::MIDI_CLOCK_IN,
    paths::TEMPO_BPM,
    paths::LAYER_1_MIDI_CHANNEL,
    paths::ARP_DIRECTION,
    paths::ARP_NOTE_DURATION,
    paths::ARP_HOLD,
    paths::ARP_RUN,
    paths::ARP_ENABLE,
];

/// The arpeggiator state and the condition variable the tempo thread
/// sleeps on.
pub(crate) struct ArpShared {
    state: Mutex<ArpState>,
    wake: Condvar,
}

impl ArpShared {
    fn new(state: ArpState) -> Self {
        Self {
            state: Mutex::new(state),
            wake: Condvar::new(),
        }
    }

    /// A panic elsewhere must not silence the instrument, so poisoning is
    /// recovered.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ArpState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, ArpState>) -> MutexGuard<'a, ArpState> {
        self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, ArpState>,
        timeout: Duration,
    ) -> MutexGuard<'a, ArpState> {
        match self.wake.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn notify(&self) {
        self.wake.notify_all();
    }
}

/// Direct ingest handle given to the upstream MIDI router. Cheap to clone.
#[derive(Clone)]
pub struct ArpInput {
    shared: Arc<ArpShared>,
    sink: Arc<dyn MidiSink>,
}

impl MidiSink for ArpInput {
    fn process_midi_event_direct(&self, event: MidiEvent) {
        let wake = self.shared.lock().process_midi(event, &*self.sink);
        if wake {
            self.shared.notify();
        }
    }
}

/// Dispatch-thread side of the arpeggiator.
struct ArpEventHandler {
    shared: Arc<ArpShared>,
    sink: Arc<dyn MidiSink>,
    registry: ParamRegistry,
}

impl ArpEventHandler {
    fn load_params(&self) {
        let mut state = self.shared.lock();
        for path in LOADED_PARAMS {
            if let Some(value) = self.registry.get(path) {
                state.apply_param(path, &value, &*self.sink);
            }
        }
        drop(state);
        self.shared.notify();
    }
}

impl EventHandler for ArpEventHandler {
    fn prepare(&mut self) -> Result<(), String> {
        for path in LOADED_PARAMS {
            if !self.registry.contains(path) {
                return Err(format!("parameter {} is not registered", path));
            }
        }
        self.load_params();
        Ok(())
    }

    fn on_param_changed(&mut self, source: EventSource, change: ParamChange) {
        let ParamChange { path, value, layers } = change;
        if is_layer_1_param(&path) && !layers.contains(0) {
            log::debug!(target: "arp", "{} ignored: layer mask {:#010b}", path, layers.bits());
            return;
        }
        let value = match self.registry.spec(&path) {
            Some(spec) => spec.coerce(value),
            None => value,
        };
        let applied = self.shared.lock().apply_param(&path, &value, &*self.sink);
        if !applied {
            return;
        }
        if is_midi_clock_in(&path) {
            log::info!(target: "arp", "clock source: {}", if value.as_bool() { "midi" } else { "internal" });
        } else if is_arp_param(&path) {
            log::debug!(target: "arp", "{} = {:?} (from {})", path, value, source);
        }
        self.shared.notify();
    }

    fn on_reload_presets(&mut self, source: EventSource, from_ab_toggle: bool) {
        // Arpeggiator params are not part of the A/B state.
        if from_ab_toggle {
            return;
        }
        log::debug!(target: "arp", "reloading params (from {})", source);
        self.load_params();
    }

    fn on_system_func(&mut self, _source: EventSource, func: SystemFunc) {
        if func.value <= 0.0 {
            return;
        }
        let mut state = self.shared.lock();
        let sink = &*self.sink;
        match func.func {
            SystemFuncType::MidiClockStart => state.transport_start(true, sink),
            SystemFuncType::MidiClockContinue => state.transport_start(false, sink),
            SystemFuncType::MidiClockStop => state.transport_stop(sink),
            SystemFuncType::AllNotesOff => state.all_notes_off(sink),
            SystemFuncType::ToggleAbState | SystemFuncType::SavePreset => return,
        }
        drop(state);
        self.shared.notify();
    }
}

pub struct ArpeggiatorManager {
    runtime: ManagerRuntime<ArpEventHandler>,
    shared: Arc<ArpShared>,
    sink: Arc<dyn MidiSink>,
    realtime_tempo: bool,
    tempo_handle: Option<JoinHandle<()>>,
}

impl ArpeggiatorManager {
    /// Create the manager and register its parameters with their defaults.
    /// `sink` receives every note the arpeggiator emits or passes through.
    pub fn new(
        registry: &ParamRegistry,
        sink: Arc<dyn MidiSink>,
        defaults: &ArpDefaults,
        realtime_dispatch: bool,
        realtime_tempo: bool,
    ) -> Self {
        register_params(registry, defaults);

        let mut state = ArpState::new();
        state.seed_rng(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
        );
        let shared = Arc::new(ArpShared::new(state));

        let handler = ArpEventHandler {
            shared: Arc::clone(&shared),
            sink: Arc::clone(&sink),
            registry: registry.clone(),
        };
        Self {
            runtime: ManagerRuntime::new(EventSource::Arpeggiator, realtime_dispatch, handler),
            shared,
            sink,
            realtime_tempo,
            tempo_handle: None,
        }
    }

    /// Subscribe to parameter, preset and system events from every
    /// controlling subsystem. Returns the number of new subscriptions.
    pub fn register_listeners(&self, router: &EventRouter) -> usize {
        let mailbox = self.runtime.mailbox();
        let mut added = 0;
        for source in SUBSCRIBED_SOURCES {
            for kind in SUBSCRIBED_KINDS {
                if router.register_listener(source, kind, &mailbox) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Handle for the upstream MIDI router.
    pub fn midi_input(&self) -> ArpInput {
        ArpInput {
            shared: Arc::clone(&self.shared),
            sink: Arc::clone(&self.sink),
        }
    }

    pub fn process_midi_event_direct(&self, event: MidiEvent) {
        self.midi_input().process_midi_event_direct(event);
    }

    /// Inspect the state under the lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&ArpState) -> R) -> R {
        f(&*self.shared.lock())
    }

    /// A tempo thread that never came up leaves the whole manager Failed.
    fn settle_start(&mut self, tempo: Result<(), String>) -> bool {
        match tempo {
            Ok(()) => true,
            Err(e) => {
                self.runtime.fail(&e);
                false
            }
        }
    }

    fn spawn_tempo_thread(&mut self) -> Result<(), String> {
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);
        let realtime = self.realtime_tempo;
        let handle = thread::Builder::new()
            .name("arp-tempo".to_string())
            .spawn(move || {
                if realtime {
                    raise_priority(EventSource::Arpeggiator);
                }
                tempo_loop(&shared, &*sink);
            })
            .map_err(|e| format!("failed to spawn tempo thread: {}", e))?;
        self.tempo_handle = Some(handle);
        Ok(())
    }
}

impl Manager for ArpeggiatorManager {
    fn identity(&self) -> EventSource {
        EventSource::Arpeggiator
    }

    fn start(&mut self) -> bool {
        if !self.runtime.start() {
            return false;
        }
        let spawned = self.spawn_tempo_thread();
        self.settle_start(spawned)
    }

    fn stop(&mut self) {
        self.runtime.stop();
        if let Some(handle) = self.tempo_handle.take() {
            {
                let mut state = self.shared.lock();
                state.all_notes_off(&*self.sink);
                state.exit = true;
            }
            self.shared.notify();
            if handle.join().is_err() {
                log::error!(target: "arp", "tempo thread panicked");
            }
        }
    }

    fn post(&self, event: Event) {
        self.runtime.post(event);
    }

    fn mailbox(&self) -> Mailbox {
        self.runtime.mailbox()
    }

    fn is_running(&self) -> bool {
        self.runtime.is_running() && self.tempo_handle.is_some()
    }
}

impl Drop for ArpeggiatorManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn register_params(registry: &ParamRegistry, defaults: &ArpDefaults) {
    registry.register(ParamSpec::toggle(paths::ARP_ENABLE, defaults.enabled));
    registry.register(ParamSpec::int(
        paths::ARP_DIRECTION,
        defaults.direction.index() as i32,
        0,
        4,
    ));
    registry.register(ParamSpec::int(
        paths::ARP_NOTE_DURATION,
        defaults.note_duration.index() as i32,
        0,
        8,
    ));
    registry.register(ParamSpec::toggle(paths::ARP_HOLD, defaults.hold));
    registry.register(ParamSpec::toggle(paths::ARP_RUN, true));
    // System params normally come from the config; these are fallbacks.
    registry.register(ParamSpec::toggle(paths::MIDI_CLOCK_IN, false));
    registry.register(ParamSpec::float(
        paths::TEMPO_BPM,
        120.0,
        cadence_core::config::MIN_TEMPO_BPM,
        cadence_core::config::MAX_TEMPO_BPM,
    ));
    registry.register(ParamSpec::int(paths::LAYER_1_MIDI_CHANNEL, 0, 0, 16));
}

/// Tempo thread body. Following an external clock it sleeps until the
/// ingest path queues pulses; otherwise it generates pulses from the tempo.
fn tempo_loop(shared: &ArpShared, sink: &dyn MidiSink) {
    let mut state = shared.lock();
    let mut next_pulse = Instant::now() + state.internal_pulse_period();
    log::debug!(target: "arp", "tempo thread running");
    loop {
        if state.exit {
            break;
        }
        state.drain_pending_pulses(sink);

        if state.midi_clock_in {
            state = shared.wait(state);
            next_pulse = Instant::now() + state.internal_pulse_period();
            continue;
        }

        let now = Instant::now();
        if now >= next_pulse {
            state.tempo_pulse(sink);
            let period = state.internal_pulse_period();
            next_pulse += period;
            if next_pulse < now {
                // Stalled for more than a pulse: resync instead of bursting.
                next_pulse = now + period;
            }
            continue;
        }
        state = shared.wait_timeout(state, next_pulse - now);
    }
    log::debug!(target: "arp", "tempo thread exited");
}
