//! Direction-mode note selection.
//!
//! Pitch comparisons are strict, so an equal pitch is never the "next" note.
//! Every miss falls through to a wrap-around (Up/Down) or a bounce (UpDown).

use cadence_types::{ArpDirection, MidiEvent};

use crate::arp_state::ArpState;

impl ArpState {
    /// Pick the next note to emit from the pool, updating the selection
    /// bookkeeping. `None` only when the pool is empty.
    pub(crate) fn select_next_note(&mut self) -> Option<MidiEvent> {
        let index = match self.arp_notes.len() {
            0 => return None,
            1 => 0,
            _ => match self.direction_mode {
                ArpDirection::Up => self.select_up()?,
                ArpDirection::Down => self.select_down()?,
                ArpDirection::UpDown => {
                    if self.updown_going_up {
                        self.select_up()?
                    } else {
                        self.select_down()?
                    }
                }
                ArpDirection::Random => self.select_random(),
                ArpDirection::Assigned => self.select_assigned(),
            },
        };
        self.arp_notes.get(index).copied()
    }

    fn select_up(&mut self) -> Option<usize> {
        let Some(last) = self.last_note else {
            return lowest(&self.arp_notes);
        };
        if let Some(index) = next_above(&self.arp_notes, last) {
            return Some(index);
        }
        if self.direction_mode == ArpDirection::UpDown {
            // Bounce off the top: step back instead of repeating it.
            self.updown_going_up = false;
            return next_below(&self.arp_notes, last).or_else(|| lowest(&self.arp_notes));
        }
        lowest(&self.arp_notes)
    }

    fn select_down(&mut self) -> Option<usize> {
        let Some(last) = self.last_note else {
            return highest(&self.arp_notes);
        };
        if let Some(index) = next_below(&self.arp_notes, last) {
            return Some(index);
        }
        if self.direction_mode == ArpDirection::UpDown {
            self.updown_going_up = true;
            return next_above(&self.arp_notes, last).or_else(|| highest(&self.arp_notes));
        }
        highest(&self.arp_notes)
    }

    fn select_assigned(&mut self) -> usize {
        if self.step >= self.arp_notes.len() {
            self.step = 0;
        }
        let index = self.step;
        self.step = (self.step + 1) % self.arp_notes.len();
        index
    }

    fn select_random(&mut self) -> usize {
        if self.step >= self.shuffle_order.len() || self.shuffle_order.len() != self.arp_notes.len() {
            self.reshuffle();
        }
        let index = self.shuffle_order[self.step];
        self.step += 1;
        index
    }

    /// Fresh Fisher-Yates permutation of pool indices.
    fn reshuffle(&mut self) {
        let len = self.arp_notes.len();
        self.shuffle_order.clear();
        self.shuffle_order.extend(0..len);
        for i in (1..len).rev() {
            let j = self.next_random() % (i + 1);
            self.shuffle_order.swap(i, j);
        }
        self.step = 0;
    }

    fn next_random(&mut self) -> usize {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng_state >> 33) as usize
    }

    /// Forget selection history so the next phrase starts from the beginning.
    pub(crate) fn reset_selection(&mut self) {
        self.updown_going_up = true;
        self.last_note = None;
        self.step = 0;
        self.shuffle_order.clear();
    }
}

fn pitch(event: &MidiEvent) -> u8 {
    event.note().unwrap_or(0)
}

fn lowest(notes: &[MidiEvent]) -> Option<usize> {
    notes.iter().enumerate().min_by_key(|(_, n)| pitch(n)).map(|(i, _)| i)
}

fn highest(notes: &[MidiEvent]) -> Option<usize> {
    notes.iter().enumerate().max_by_key(|(_, n)| pitch(n)).map(|(i, _)| i)
}

/// Lowest note strictly above `last`.
fn next_above(notes: &[MidiEvent], last: u8) -> Option<usize> {
    notes
        .iter()
        .enumerate()
        .filter(|(_, n)| pitch(n) > last)
        .min_by_key(|(_, n)| pitch(n))
        .map(|(i, _)| i)
}

/// Highest note strictly below `last`.
fn next_below(notes: &[MidiEvent], last: u8) -> Option<usize> {
    notes
        .iter()
        .enumerate()
        .filter(|(_, n)| pitch(n) < last)
        .max_by_key(|(_, n)| pitch(n))
        .map(|(i, _)| i)
}
