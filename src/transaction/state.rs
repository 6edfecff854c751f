//! Transaction state labels and validated transitions.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};
use crate::transaction::key::TransactionKind;

/// The union of every state label used by the four machines plus Stale.
/// Which subset is reachable, and which edges are legal between them, is
/// machine-specific and enforced by [`validate_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransactionState {
    /// Client transaction has been registered with the table but the TU has
    /// not yet triggered the initial send.
    Initial = 0,
    Calling = 1,
    Trying = 2,
    Proceeding = 3,
    Completed = 4,
    Confirmed = 5,
    Terminated = 6,
    Stale = 7,
}

impl TransactionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TransactionState::Initial,
            1 => TransactionState::Calling,
            2 => TransactionState::Trying,
            3 => TransactionState::Proceeding,
            4 => TransactionState::Completed,
            5 => TransactionState::Confirmed,
            6 => TransactionState::Terminated,
            7 => TransactionState::Stale,
            _ => unreachable!("invalid TransactionState discriminant"),
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Lock-free current-state cell shared between the table entry and
/// anything observing it (tests, logging).
#[derive(Debug)]
pub struct AtomicTransactionState(AtomicU8);

impl AtomicTransactionState {
    pub fn new(initial: TransactionState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> TransactionState {
        TransactionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Set the state, returning the previous value.
    pub fn set(&self, new_state: TransactionState) -> TransactionState {
        let prev = self.0.swap(new_state as u8, Ordering::AcqRel);
        TransactionState::from_u8(prev)
    }

    /// Check that `from -> to` is a legal edge for `kind`'s per-machine
    /// transition table. A defensive check after an FSM step proposes a
    /// transition; an `Err` here indicates a bug in the FSM itself, not bad
    /// input, so callers log it rather than panicking.
    pub fn validate_transition(kind: TransactionKind, from: TransactionState, to: TransactionState) -> Result<()> {
        use TransactionState::*;
        let ok = match kind {
            TransactionKind::InviteClient => matches!(
                (from, to),
                (Initial, Calling)
                    | (Calling, Proceeding)
                    | (Calling, Completed)
                    | (Calling, Terminated)
                    | (Proceeding, Completed)
                    | (Proceeding, Terminated)
                    | (Completed, Terminated)
            ),
            TransactionKind::NonInviteClient => matches!(
                (from, to),
                (Initial, Trying)
                    | (Trying, Proceeding)
                    | (Trying, Completed)
                    | (Trying, Terminated)
                    | (Proceeding, Completed)
                    | (Proceeding, Terminated)
                    | (Completed, Terminated)
            ),
            TransactionKind::InviteServer => matches!(
                (from, to),
                (Proceeding, Completed)
                    | (Proceeding, Terminated)
                    | (Completed, Confirmed)
                    | (Completed, Terminated)
                    | (Confirmed, Terminated)
            ),
            TransactionKind::NonInviteServer => matches!(
                (from, to),
                (Trying, Proceeding)
                    | (Trying, Completed)
                    | (Trying, Terminated)
                    | (Proceeding, Completed)
                    | (Proceeding, Terminated)
                    | (Completed, Terminated)
            ),
        } || to == Stale;

        if ok {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                tx_id: String::new(),
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}
