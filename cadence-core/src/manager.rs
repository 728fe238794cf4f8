//! Manager (actor) runtime.
//!
//! Every subsystem runs inside a manager: one dedicated dispatch thread that
//! drains an ordered mailbox and hands each event to the subsystem's
//! [`EventHandler`]. Lifecycle is Created -> Running -> Stopped, with Failed
//! reached when `start()` cannot prepare or spawn.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use thread_priority::ThreadPriority;

use cadence_types::{
    Event, EventPayload, EventSource, MidiEvent, ParamChange, SurfaceControlFunc, SystemFunc,
};

use crate::mailbox::Mailbox;

/// Subsystem logic run on a manager's dispatch thread. Every hook defaults to
/// ignoring the event, so a subsystem only implements the kinds it consumes.
pub trait EventHandler: Send + 'static {
    /// Called from `start()` on the caller's thread before the dispatch thread
    /// is spawned (load persisted state, open devices). An error aborts start.
    fn prepare(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn on_midi_note(&mut self, _source: EventSource, _midi: MidiEvent) {}

    fn on_param_changed(&mut self, _source: EventSource, _change: ParamChange) {}

    fn on_system_func(&mut self, _source: EventSource, _func: SystemFunc) {}

    fn on_reload_presets(&mut self, _source: EventSource, _from_ab_toggle: bool) {}

    fn on_surface_control_func(&mut self, _source: EventSource, _func: SurfaceControlFunc) {}

    /// Called on the dispatch thread after its loop exits.
    fn on_stop(&mut self) {}
}

/// Route one event to the handler hook for its kind.
pub fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, event: Event) {
    let source = event.source();
    match event.into_payload() {
        EventPayload::MidiNote(midi) => handler.on_midi_note(source, midi),
        EventPayload::ParamChanged(change) => handler.on_param_changed(source, change),
        EventPayload::SystemFunc(func) => handler.on_system_func(source, func),
        EventPayload::ReloadPresets { from_ab_toggle } => {
            handler.on_reload_presets(source, from_ab_toggle)
        }
        EventPayload::SurfaceControlFunc(func) => handler.on_surface_control_func(source, func),
    }
}

/// Lifecycle contract shared by all managers.
pub trait Manager: Send {
    fn identity(&self) -> EventSource;

    /// Prepare and spawn the processing thread(s). Returns false on an
    /// unrecoverable setup failure; events must not be routed to it then.
    fn start(&mut self) -> bool;

    /// Signal the processing thread(s) to exit and join them. Idempotent, and
    /// safe when `start()` was never called or failed.
    fn stop(&mut self);

    /// Enqueue an event from any thread.
    fn post(&self, event: Event);

    /// Handle to register with the router.
    fn mailbox(&self) -> Mailbox;

    fn is_running(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Created,
    Running,
    Failed,
    Stopped,
}

/// Generic manager: owns the mailbox, the dispatch thread and the handler.
pub struct ManagerRuntime<H: EventHandler> {
    identity: EventSource,
    realtime: bool,
    state: ManagerState,
    mailbox: Mailbox,
    receiver: Option<Receiver<Event>>,
    handler: Option<H>,
    /// Dropped by `stop()`; the disconnect wakes the dispatch thread.
    shutdown_tx: Option<Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl<H: EventHandler> ManagerRuntime<H> {
    pub fn new(identity: EventSource, realtime: bool, handler: H) -> Self {
        let (mailbox, receiver) = Mailbox::channel(identity);
        Self {
            identity,
            realtime,
            state: ManagerState::Created,
            mailbox,
            receiver: Some(receiver),
            handler: Some(handler),
            shutdown_tx: None,
            join_handle: None,
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Abandon a start that failed after the dispatch thread came up. The
    /// thread is joined and the runtime stays Failed, so it cannot be
    /// restarted.
    pub fn fail(&mut self, reason: &str) {
        log::error!(target: "manager", "{}: start failed: {}", self.identity, reason);
        self.join_dispatch();
        self.state = ManagerState::Failed;
    }

    fn join_dispatch(&mut self) {
        self.shutdown_tx.take();
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                log::error!(target: "manager", "{}: dispatch thread panicked", self.identity);
            }
            log::info!(target: "manager", "{}: stopped", self.identity);
        }
    }

    fn spawn(&mut self) -> Result<(), String> {
        let mut handler = self.handler.take().ok_or("handler already consumed")?;
        let receiver = self.receiver.take().ok_or("mailbox receiver already consumed")?;

        handler.prepare()?;

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let identity = self.identity;
        let realtime = self.realtime;
        let join_handle = thread::Builder::new()
            .name(format!("mgr-{}", identity))
            .spawn(move || {
                if realtime {
                    raise_priority(identity);
                }
                dispatch_loop(identity, handler, receiver, shutdown_rx);
            })
            .map_err(|e| format!("failed to spawn dispatch thread: {}", e))?;

        self.shutdown_tx = Some(shutdown_tx);
        self.join_handle = Some(join_handle);
        Ok(())
    }
}

impl<H: EventHandler> Manager for ManagerRuntime<H> {
    fn identity(&self) -> EventSource {
        self.identity
    }

    fn start(&mut self) -> bool {
        if self.state != ManagerState::Created {
            log::warn!(target: "manager", "{}: start() in state {:?} ignored", self.identity, self.state);
            return false;
        }
        match self.spawn() {
            Ok(()) => {
                self.state = ManagerState::Running;
                log::info!(target: "manager", "{}: started", self.identity);
                true
            }
            Err(e) => {
                self.state = ManagerState::Failed;
                log::error!(target: "manager", "{}: start failed: {}", self.identity, e);
                false
            }
        }
    }

    fn stop(&mut self) {
        self.join_dispatch();
        if self.state == ManagerState::Running || self.state == ManagerState::Created {
            self.state = ManagerState::Stopped;
        }
    }

    fn post(&self, event: Event) {
        self.mailbox.deliver(event);
    }

    fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    fn is_running(&self) -> bool {
        self.state == ManagerState::Running
    }
}

impl<H: EventHandler> Drop for ManagerRuntime<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Dispatch thread body: block until an event or the shutdown signal arrives.
fn dispatch_loop<H: EventHandler>(
    identity: EventSource,
    mut handler: H,
    receiver: Receiver<Event>,
    shutdown_rx: Receiver<()>,
) {
    loop {
        crossbeam_channel::select! {
            recv(shutdown_rx) -> _ => break,
            recv(receiver) -> result => match result {
                Ok(event) => dispatch(&mut handler, event),
                Err(_) => break, // Disconnected
            },
        }
    }
    handler.on_stop();
    log::debug!(target: "manager", "{}: dispatch loop exited", identity);
}

/// Elevate the calling thread to the highest priority class. Failure is
/// logged and non-fatal.
pub fn raise_priority(identity: EventSource) {
    match thread_priority::set_current_thread_priority(ThreadPriority::Max) {
        Ok(()) => log::debug!(target: "manager", "{}: realtime priority set", identity),
        Err(e) => {
            log::warn!(target: "manager", "{}: could not raise thread priority: {:?}", identity, e)
        }
    }
}
