//! Screen state machines for the record editor and record lister.
//!
//! # Responsibility
//! - Hold per-screen UI state (`loading`, `error`, results) independent of
//!   any UI toolkit.
//! - Split every store-backed action into `begin_*` (validate, mark busy,
//!   hand out a ticket) and `finish_*` (apply the store result).
//!
//! # Invariants
//! - A result is applied only when its ticket is the screen's current
//!   request and the screen has not been disposed. Late results are dropped.
//! - Each screen issues at most one store call per begun action.

use log::debug;
use uuid::Uuid;

pub mod editor;
pub mod lister;

/// Identifies one store request begun by a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(Uuid);

impl RequestTicket {
    fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Whether a finished request changed screen state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// Stale ticket or disposed screen; state left untouched.
    Discarded,
}

/// Tracks the in-flight request and liveness of one screen.
#[derive(Debug, Default)]
pub(crate) struct RequestGate {
    in_flight: Option<RequestTicket>,
    disposed: bool,
}

impl RequestGate {
    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Issues a ticket and makes it the current request, superseding any
    /// earlier one.
    pub(crate) fn begin(&mut self) -> RequestTicket {
        let ticket = RequestTicket::issue();
        self.in_flight = Some(ticket);
        ticket
    }

    /// Returns `true` when `ticket` is current on a live screen, and
    /// releases it.
    pub(crate) fn settle(&mut self, screen: &'static str, ticket: RequestTicket) -> bool {
        // Why: store calls cannot be cancelled once sent; comparing tickets is
        // what keeps a slow answer from overwriting a newer request or a
        // closed screen.
        if self.disposed || self.in_flight != Some(ticket) {
            debug!(
                "event=result_discarded module=screen screen={screen} disposed={}",
                self.disposed
            );
            return false;
        }
        self.in_flight = None;
        true
    }

    pub(crate) fn dispose(&mut self) {
        self.disposed = true;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::RequestGate;

    #[test]
    fn only_current_ticket_settles() {
        let mut gate = RequestGate::default();
        let first = gate.begin();
        let second = gate.begin();

        assert!(!gate.settle("test", first));
        assert!(gate.is_busy());
        assert!(gate.settle("test", second));
        assert!(!gate.is_busy());
        assert!(!gate.settle("test", second));
    }

    #[test]
    fn disposed_gate_rejects_everything() {
        let mut gate = RequestGate::default();
        let ticket = gate.begin();
        gate.dispose();

        assert!(gate.is_disposed());
        assert!(!gate.is_busy());
        assert!(!gate.settle("test", ticket));
    }
}
