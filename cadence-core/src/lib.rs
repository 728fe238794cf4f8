//! # cadence-core
//!
//! Concurrency substrate of the cadence control plane: the event bus that
//! connects subsystems, the manager (actor) runtime each subsystem runs
//! inside, and the shared parameter registry.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadence_core::{EventRouter, ManagerRuntime, Manager, ParamRegistry};
//! use cadence_types::{Event, EventKind, EventSource};
//!
//! let router = Arc::new(EventRouter::new());
//! let mut gui = ManagerRuntime::new(EventSource::Gui, false, MyHandler::default());
//! router.register_listener(EventSource::SurfaceControl, EventKind::ParamChanged, &gui.mailbox());
//! assert!(gui.start());
//! router.publish(Event::param_changed(EventSource::SurfaceControl, change));
//! gui.stop();
//! ```
//!
//! ## Module Overview
//!
//! - [`router`] - `EventRouter`: (kind, source) -> mailbox registry with copy-per-listener fan-out
//! - [`mailbox`] - `Mailbox`: cloneable FIFO handle onto a manager's queue
//! - [`manager`] - `Manager` trait, `EventHandler` hooks and the threaded `ManagerRuntime`
//! - [`params`] - `ParamRegistry`: shared, lock-protected parameter table with mapping graph
//! - [`sink`] - `MidiSink`: direct, non-queued MIDI delivery between managers
//! - [`config`] - TOML configuration loading (embedded defaults + user override)

pub mod config;
pub mod mailbox;
pub mod manager;
pub mod params;
pub mod router;
pub mod sink;

pub use config::Config;
pub use mailbox::Mailbox;
pub use manager::{dispatch, EventHandler, Manager, ManagerRuntime, ManagerState};
pub use params::ParamRegistry;
pub use router::EventRouter;
pub use sink::MidiSink;
