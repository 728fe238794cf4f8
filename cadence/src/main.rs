mod console;
mod daw;

use std::fs::File;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use cadence_arp::{ArpInput, ArpeggiatorManager};
use cadence_core::params::is_layer_1_param;
use cadence_core::{Config, EventRouter, Manager, MidiSink, ParamRegistry};
use cadence_types::{
    paths, Event, EventKind, EventSource, LayerMask, MidiEvent, MidiEventKind, ParamChange,
    ParamValue, SystemFunc, SystemFuncType,
};

use console::Command;
use daw::DawOutput;

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("cadence.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/cadence.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("cadence: cannot create log file: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("cadence: failed to initialize logger: {}", e);
        return;
    }

    log::info!("cadence starting (log level: {:?})", log_level);
}

/// Everything the console needs to turn commands into bus traffic.
struct Surface<'a> {
    router: &'a EventRouter,
    registry: &'a ParamRegistry,
    arp_input: ArpInput,
    arp: &'a ArpeggiatorManager,
    daw: &'a DawOutput,
    channel: u8,
}

impl Surface<'_> {
    fn publish(&self, event: Event) {
        self.router.publish(event);
    }

    fn apply(&self, command: Command) {
        match command {
            Command::Note { note, velocity } => self
                .arp_input
                .process_midi_event_direct(MidiEvent::note_on(self.channel, note, velocity)),
            Command::Off { note } => self
                .arp_input
                .process_midi_event_direct(MidiEvent::note_off(self.channel, note)),
            Command::Set { path, value } => {
                let updated = self.registry.set_with_mapped(&path, value);
                if updated.is_empty() {
                    println!("unknown parameter: {}", path);
                    return;
                }
                for target in updated {
                    if let Some(value) = self.registry.get(&target) {
                        println!("{} = {:?}", target, value);
                        self.publish(Event::param_changed(
                            EventSource::SurfaceControl,
                            param_change(&target, value),
                        ));
                    }
                }
            }
            Command::Reload => {
                self.publish(Event::reload_presets(EventSource::SurfaceControl, false))
            }
            Command::Clock { pulses } => {
                for _ in 0..pulses {
                    self.arp_input
                        .process_midi_event_direct(MidiEvent::new(0, MidiEventKind::Clock));
                }
            }
            Command::Start => self.system_func(SystemFuncType::MidiClockStart),
            Command::Stop => self.system_func(SystemFuncType::MidiClockStop),
            Command::Panic => self.system_func(SystemFuncType::AllNotesOff),
            Command::Status => self.print_status(),
            Command::Help => println!("{}", console::HELP),
            Command::Quit => {}
        }
    }

    fn system_func(&self, func: SystemFuncType) {
        self.publish(Event::system_func(EventSource::SurfaceControl, SystemFunc::new(func)));
    }

    fn print_status(&self) {
        let counters = self.daw.counters();
        println!(
            "daw: {} on / {} off / {} other, {} sounding",
            counters.note_ons(),
            counters.note_offs(),
            counters.other(),
            self.daw.sounding()
        );
        self.arp.with_state(|s| {
            println!(
                "arp: {:?} enabled={} hold={} started={} {} {} clock={} pool={:?}",
                s.fsm_state(),
                s.enabled(),
                s.hold(),
                s.started(),
                s.direction_mode().name(),
                s.note_duration().name(),
                if s.midi_clock_in() { "midi" } else { "internal" },
                s.arp_notes().iter().filter_map(|n| n.note()).collect::<Vec<_>>(),
            );
        });
        for path in self.registry.paths() {
            if let Some(value) = self.registry.get(&path) {
                println!("  {} = {:?}", path, value);
            }
        }
    }
}

/// The console edits one layer at a time, so `layer_1/*` values are scoped
/// to the first layer.
fn param_change(path: &str, value: ParamValue) -> ParamChange {
    let change = ParamChange::new(path, value);
    if is_layer_1_param(path) {
        change.with_layers(LayerMask::layer(0))
    } else {
        change
    }
}

/// Stdin reader on its own thread, so the main loop can keep ticking.
fn spawn_reader() -> std::io::Result<crossbeam_channel::Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new().name("console".to_string()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    })?;
    Ok(rx)
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);
    let config = match &config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let registry = ParamRegistry::new();
    config.register_system_params(&registry);
    let router = Arc::new(EventRouter::new());

    let (mut daw, daw_output) = daw::daw_manager(config.realtime_managers());
    router.register_listener(EventSource::MidiDevice, EventKind::MidiNote, &daw.mailbox());
    router.register_listener(EventSource::SurfaceControl, EventKind::SystemFunc, &daw.mailbox());

    let mut arp = ArpeggiatorManager::new(
        &registry,
        Arc::new(daw_output.clone()),
        &config.arp_defaults(),
        config.realtime_managers(),
        config.realtime_tempo(),
    );
    arp.register_listeners(&router);

    if !daw.start() {
        log::error!("daw manager failed to start");
        std::process::exit(1);
    }
    if !arp.start() {
        log::error!("arpeggiator failed to start");
        daw.stop();
        std::process::exit(1);
    }

    let channel = match config.midi_channel() {
        0 => 0,
        ch => ch - 1,
    };
    let surface = Surface {
        router: &router,
        registry: &registry,
        arp_input: arp.midi_input(),
        arp: &arp,
        daw: &daw_output,
        channel,
    };

    println!("cadence ready (type help for commands)");
    let lines = spawn_reader()?;
    loop {
        match lines.recv_timeout(Duration::from_secs(10)) {
            Ok(line) => match console::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => surface.apply(command),
                Ok(None) => {}
                Err(e) => println!("{}", e),
            },
            Err(RecvTimeoutError::Timeout) => {
                let counters = daw_output.counters();
                log::debug!(
                    "notes out: {} on / {} off, tempo {:?} bpm",
                    counters.note_ons(),
                    counters.note_offs(),
                    registry.get_f32(paths::TEMPO_BPM)
                );
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(surface);
    arp.stop();
    daw.stop();
    log::info!("cadence stopped");
    Ok(())
}
