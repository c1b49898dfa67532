//! Interruptible waits.
//!
//! A [`Wait`] is a tiny state machine: the caller polls it with the current
//! time and the live contacts, and it answers whether to keep going, whether
//! it ran out, or which abort condition fired. Nothing here sleeps; the
//! keyer busy-polls and calls [`Clock::relax`](crate::hal::Clock::relax)
//! between polls so contact changes are seen within one iteration.

use crate::hal::{Contact, Contacts};

/// A contact condition that cuts a wait short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Abort {
    pub contact: Contact,
    /// Fire when the contact is closed (`true`) or open (`false`).
    pub closed: bool,
}

impl Abort {
    pub const fn closed(contact: Contact) -> Self {
        Self { contact, closed: true }
    }

    pub const fn released(contact: Contact) -> Self {
        Self { contact, closed: false }
    }

    #[inline]
    pub fn check<C: Contacts + ?Sized>(&self, contacts: &mut C) -> bool {
        contacts.is_closed(self.contact) == self.closed
    }
}

/// Either paddle closing.
pub const PADDLE_ABORTS: [Abort; 2] = [Abort::closed(Contact::Dit), Abort::closed(Contact::Dah)];

/// Result of one poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    Continue,
    Completed,
    Interrupted(Abort),
}

/// A wait with an optional deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wait {
    end_ms: Option<u64>,
}

impl Wait {
    /// Wait `duration_ms` starting at `now_ms`.
    pub fn for_ms(now_ms: u64, duration_ms: u32) -> Self {
        Self { end_ms: Some(now_ms + u64::from(duration_ms)) }
    }

    /// Wait with no deadline. Only an abort ends it, so callers always pass
    /// at least one condition a human can satisfy.
    pub const fn until_abort() -> Self {
        Self { end_ms: None }
    }

    pub fn deadline(&self) -> Option<u64> {
        self.end_ms
    }

    /// Check deadline first, then each abort in order.
    pub fn poll<C: Contacts + ?Sized>(&self, now_ms: u64, contacts: &mut C, aborts: &[Abort]) -> WaitStatus {
        if let Some(end) = self.end_ms {
            if now_ms >= end {
                return WaitStatus::Completed;
            }
        }
        for abort in aborts {
            if abort.check(contacts) {
                return WaitStatus::Interrupted(*abort);
            }
        }
        WaitStatus::Continue
    }
}
