use std::time::{Duration, Instant};

/// Handle to one scheduled firing. Goes stale as soon as its slot is
/// rescheduled or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub generation: u64,
    pub due_at: Instant,
}

/// A single cancellable timer. Scheduling again supersedes the pending firing.
#[derive(Debug, Clone, Default)]
pub struct TimerSlot {
    generation: u64,
    pending: Option<TimerTicket>,
}

impl TimerSlot {
    pub fn schedule(&mut self, now: Instant, delay: Duration) -> TimerTicket {
        self.generation += 1;
        let ticket = TimerTicket {
            generation: self.generation,
            due_at: now + delay,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Returns true when a pending firing was dropped.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|ticket| ticket.due_at)
    }

    pub fn is_current(&self, ticket: TimerTicket) -> bool {
        self.pending == Some(ticket) && ticket.generation == self.generation
    }

    /// Fires `ticket` if it is still the pending one and due.
    pub fn fire(&mut self, ticket: TimerTicket, now: Instant) -> bool {
        if self.is_current(ticket) && ticket.due_at <= now {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Fires whatever is pending if it is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(ticket) => self.fire(ticket, now),
            None => false,
        }
    }
}
