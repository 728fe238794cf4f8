use std::path::{Path, PathBuf};

use serde::Deserialize;

use cadence_types::{paths, ArpDirection, NoteDuration, ParamSpec};

use crate::params::ParamRegistry;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

pub const MIN_TEMPO_BPM: f32 = 20.0;
pub const MAX_TEMPO_BPM: f32 = 300.0;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    runtime: RuntimeConfig,
    #[serde(default)]
    clock: ClockConfig,
    #[serde(default)]
    arp: ArpConfig,
}

#[derive(Deserialize, Default)]
struct RuntimeConfig {
    realtime_managers: Option<bool>,
    realtime_tempo: Option<bool>,
}

#[derive(Deserialize, Default)]
struct ClockConfig {
    tempo_bpm: Option<f32>,
    midi_clock_in: Option<bool>,
}

#[derive(Deserialize, Default)]
struct ArpConfig {
    enabled: Option<bool>,
    hold: Option<bool>,
    direction: Option<String>,
    note_duration: Option<String>,
    midi_channel: Option<u8>,
}

/// Arpeggiator start-up values, registered as parameter defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpDefaults {
    pub enabled: bool,
    pub hold: bool,
    pub direction: ArpDirection,
    pub note_duration: NoteDuration,
}

impl Default for ArpDefaults {
    fn default() -> Self {
        Self {
            enabled: false,
            hold: false,
            direction: ArpDirection::Up,
            note_duration: NoteDuration::Eighth,
        }
    }
}

pub struct Config {
    runtime: RuntimeConfig,
    clock: ClockConfig,
    arp: ArpConfig,
}

impl Config {
    /// Embedded defaults merged with the user file, if present.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                config.merge_file(&path);
            }
        }
        config
    }

    /// Embedded defaults merged with an explicit file.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        config.merge_file(path);
        config
    }

    fn embedded() -> Self {
        let base: ConfigFile = match toml::from_str(DEFAULT_CONFIG) {
            Ok(base) => base,
            Err(e) => {
                log::error!(target: "config", "embedded config.toml is malformed: {}", e);
                ConfigFile::default()
            }
        };
        Config {
            runtime: base.runtime,
            clock: base.clock,
            arp: base.arp,
        }
    }

    fn merge_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => {
                    merge_runtime(&mut self.runtime, user.runtime);
                    merge_clock(&mut self.clock, user.clock);
                    merge_arp(&mut self.arp, user.arp);
                }
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
    }

    pub fn realtime_managers(&self) -> bool {
        self.runtime.realtime_managers.unwrap_or(false)
    }

    pub fn realtime_tempo(&self) -> bool {
        self.runtime.realtime_tempo.unwrap_or(true)
    }

    /// Internal clock tempo (clamped to 20..=300 BPM).
    pub fn tempo_bpm(&self) -> f32 {
        self.clock
            .tempo_bpm
            .unwrap_or(120.0)
            .clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)
    }

    pub fn midi_clock_in(&self) -> bool {
        self.clock.midi_clock_in.unwrap_or(false)
    }

    /// Primary layer MIDI channel filter: 0 = omni, 1..=16.
    pub fn midi_channel(&self) -> u8 {
        self.arp.midi_channel.unwrap_or(0).min(16)
    }

    pub fn arp_defaults(&self) -> ArpDefaults {
        let fallback = ArpDefaults::default();
        ArpDefaults {
            enabled: self.arp.enabled.unwrap_or(fallback.enabled),
            hold: self.arp.hold.unwrap_or(fallback.hold),
            direction: self
                .arp
                .direction
                .as_deref()
                .and_then(ArpDirection::from_name)
                .unwrap_or(fallback.direction),
            note_duration: self
                .arp
                .note_duration
                .as_deref()
                .and_then(NoteDuration::from_name)
                .unwrap_or(fallback.note_duration),
        }
    }

    /// Register the system-level parameters owned by no single manager.
    pub fn register_system_params(&self, registry: &ParamRegistry) {
        registry.register(ParamSpec::toggle(paths::MIDI_CLOCK_IN, self.midi_clock_in()));
        registry.register(ParamSpec::float(
            paths::TEMPO_BPM,
            self.tempo_bpm(),
            MIN_TEMPO_BPM,
            MAX_TEMPO_BPM,
        ));
        registry.register(ParamSpec::int(
            paths::LAYER_1_MIDI_CHANNEL,
            self.midi_channel() as i32,
            0,
            16,
        ));
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cadence").join("config.toml"))
}

fn merge_runtime(base: &mut RuntimeConfig, user: RuntimeConfig) {
    if user.realtime_managers.is_some() {
        base.realtime_managers = user.realtime_managers;
    }
    if user.realtime_tempo.is_some() {
        base.realtime_tempo = user.realtime_tempo;
    }
}

fn merge_clock(base: &mut ClockConfig, user: ClockConfig) {
    if user.tempo_bpm.is_some() {
        base.tempo_bpm = user.tempo_bpm;
    }
    if user.midi_clock_in.is_some() {
        base.midi_clock_in = user.midi_clock_in;
    }
}

fn merge_arp(base: &mut ArpConfig, user: ArpConfig) {
    if user.enabled.is_some() {
        base.enabled = user.enabled;
    }
    if user.hold.is_some() {
        base.hold = user.hold;
    }
    if user.direction.is_some() {
        base.direction = user.direction;
    }
    if user.note_duration.is_some() {
        base.note_duration = user.note_duration;
    }
    if user.midi_channel.is_some() {
        base.midi_channel = user.midi_channel;
    }
}
