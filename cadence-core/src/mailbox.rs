//! Manager mailboxes.
//!
//! A mailbox is the sending half of an unbounded crossbeam channel tagged
//! with a process-unique id. Clones share the id, so the router can compare
//! handles without holding references into a manager.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};

use cadence_types::{Event, EventSource};

static NEXT_MAILBOX_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct Mailbox {
    id: u64,
    owner: EventSource,
    tx: Sender<Event>,
}

impl Mailbox {
    /// Create a mailbox and the receiver its owning thread drains.
    pub fn channel(owner: EventSource) -> (Self, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mailbox = Self {
            id: NEXT_MAILBOX_ID.fetch_add(1, Ordering::Relaxed),
            owner,
            tx,
        };
        (mailbox, rx)
    }

    pub fn owner(&self) -> EventSource {
        self.owner
    }

    /// Enqueue an event. Returns false if the owning manager is gone.
    pub fn deliver(&self, event: Event) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(target: "router", "mailbox {} ({}) disconnected, dropping {:?}", self.id, self.owner, e.0.kind());
                false
            }
        }
    }

    /// Events queued but not yet dispatched.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl PartialEq for Mailbox {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Mailbox {}
