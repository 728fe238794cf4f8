//! Event router: publish/subscribe registry connecting producers to manager
//! mailboxes.
//!
//! Listeners register interest in an (event kind, source identity) pair. A
//! published event is cloned once per matching listener and pushed onto that
//! listener's mailbox. The table sits behind an `RwLock`, so registration may
//! happen late and from any thread while other threads publish.

use std::sync::RwLock;

use cadence_types::{Event, EventKind, EventSource};

use crate::mailbox::Mailbox;

#[derive(Debug, Clone)]
struct Listener {
    identity: EventSource,
    kind: EventKind,
    mailbox: Mailbox,
}

#[derive(Debug, Default)]
pub struct EventRouter {
    listeners: RwLock<Vec<Listener>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mailbox` for events of `kind` published by `identity`.
    /// Duplicate registrations are ignored; returns whether a new entry was added.
    pub fn register_listener(&self, identity: EventSource, kind: EventKind, mailbox: &Mailbox) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let exists = listeners
            .iter()
            .any(|l| l.identity == identity && l.kind == kind && l.mailbox == *mailbox);
        if exists {
            return false;
        }
        log::debug!(target: "router", "listener {} <- ({}, {:?})", mailbox.owner(), identity, kind);
        listeners.push(Listener {
            identity,
            kind,
            mailbox: mailbox.clone(),
        });
        true
    }

    /// Drop every registration pointing at `mailbox`. Returns the number removed.
    pub fn unregister_mailbox(&self, mailbox: &Mailbox) -> usize {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|l| l.mailbox != *mailbox);
        before - listeners.len()
    }

    /// Deliver a copy of `event` to every listener registered for its kind and
    /// source. The event is consumed. Returns the number of mailboxes reached.
    pub fn publish(&self, event: Event) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;
        for listener in listeners
            .iter()
            .filter(|l| l.kind == event.kind() && l.identity == event.source())
        {
            if listener.mailbox.deliver(event.clone()) {
                delivered += 1;
            }
        }
        if delivered == 0 {
            log::debug!(target: "router", "no listener for ({}, {:?})", event.source(), event.kind());
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_types::{EventPayload, ParamChange, ParamValue};

    fn param_event(source: EventSource) -> Event {
        Event::param_changed(source, ParamChange::new("arp/hold", ParamValue::Bool(true)))
    }

    #[test]
    fn duplicate_registration_is_a_no_op() {
        let router = EventRouter::new();
        let (mailbox, _rx) = Mailbox::channel(EventSource::Arpeggiator);
        assert!(router.register_listener(EventSource::Gui, EventKind::ParamChanged, &mailbox));
        assert!(!router.register_listener(EventSource::Gui, EventKind::ParamChanged, &mailbox.clone()));
        assert_eq!(router.listener_count(), 1);
    }

    #[test]
    fn publish_matches_source_and_kind() {
        let router = EventRouter::new();
        let (matching, matching_rx) = Mailbox::channel(EventSource::Arpeggiator);
        let (other_source, other_source_rx) = Mailbox::channel(EventSource::Daw);
        let (other_kind, other_kind_rx) = Mailbox::channel(EventSource::Gui);
        router.register_listener(EventSource::SurfaceControl, EventKind::ParamChanged, &matching);
        router.register_listener(EventSource::Osc, EventKind::ParamChanged, &other_source);
        router.register_listener(EventSource::SurfaceControl, EventKind::ReloadPresets, &other_kind);

        assert_eq!(router.publish(param_event(EventSource::SurfaceControl)), 1);

        let got = matching_rx.try_recv().unwrap();
        assert_eq!(got.source(), EventSource::SurfaceControl);
        assert!(matches!(got.payload(), EventPayload::ParamChanged(_)));
        assert!(other_source_rx.try_recv().is_err());
        assert!(other_kind_rx.try_recv().is_err());
    }

    #[test]
    fn every_matching_listener_gets_a_copy() {
        let router = EventRouter::new();
        let (a, a_rx) = Mailbox::channel(EventSource::Arpeggiator);
        let (b, b_rx) = Mailbox::channel(EventSource::Daw);
        router.register_listener(EventSource::Gui, EventKind::ParamChanged, &a);
        router.register_listener(EventSource::Gui, EventKind::ParamChanged, &b);

        assert_eq!(router.publish(param_event(EventSource::Gui)), 2);
        assert_eq!(a_rx.try_recv().unwrap(), b_rx.try_recv().unwrap());
    }

    #[test]
    fn publish_without_listeners_is_dropped() {
        let router = EventRouter::new();
        assert_eq!(router.publish(param_event(EventSource::Gui)), 0);
    }

    #[test]
    fn unregister_removes_all_entries_for_mailbox() {
        let router = EventRouter::new();
        let (a, a_rx) = Mailbox::channel(EventSource::Arpeggiator);
        router.register_listener(EventSource::Gui, EventKind::ParamChanged, &a);
        router.register_listener(EventSource::Osc, EventKind::ParamChanged, &a);
        assert_eq!(router.unregister_mailbox(&a), 2);
        assert_eq!(router.publish(param_event(EventSource::Gui)), 0);
        assert!(a_rx.try_recv().is_err());
    }

    #[test]
    fn dead_mailbox_is_skipped() {
        let router = EventRouter::new();
        let (a, a_rx) = Mailbox::channel(EventSource::Arpeggiator);
        router.register_listener(EventSource::Gui, EventKind::ParamChanged, &a);
        drop(a_rx);
        assert_eq!(router.publish(param_event(EventSource::Gui)), 0);
    }
}
