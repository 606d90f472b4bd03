/// Last-write-wins sequencing for overlapping async operations.
///
/// Before an operation suspends it takes a [`Ticket`]. When it resumes, its result is
/// applied only if no newer ticket has been issued meanwhile. Superseded operations
/// still run to completion; their results are dropped.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    latest: Arc<AtomicU64>,
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer::default()
    }

    /// Issues a ticket that supersedes every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let seq = Sequencer::new();
        let first = seq.issue();
        assert!(seq.is_current(first));

        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }

    #[test]
    fn test_clones_share_sequence() {
        let seq = Sequencer::new();
        let other = seq.clone();
        let ticket = seq.issue();
        other.issue();
        assert!(!seq.is_current(ticket));
    }
}
