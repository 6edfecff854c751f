//! The transaction record.
//!
//! A `Transaction` is plain, table-owned data: no back-pointer to the
//! manager, the transport, or the table itself. FSM step functions take `&mut
//! Transaction` and return the actions the dispatcher should carry out;
//! they never reach back into the table or destroy the record themselves.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::message::{Message, SipRequest};
use crate::timer::{TimerHandle, TimerKind, TimerSettings};
use crate::transaction::key::{TransactionKey, TransactionKind};
use crate::transaction::state::{AtomicTransactionState, TransactionState};

/// A single transaction's complete state, owned exclusively by the
/// dispatcher's transaction table.
pub struct Transaction {
    pub id: TransactionKey,
    pub kind: TransactionKind,
    pub state: AtomicTransactionState,

    /// Derived once at creation from the transport used.
    pub reliable: bool,
    pub remote_addr: SocketAddr,

    /// The request that started this transaction (client: what the TU
    /// asked to send; server: what transport delivered).
    pub original_request: SipRequest,

    /// The last message sent that may need retransmission: the request
    /// itself (client, before a final response), or the last response sent
    /// (server), or the locally-generated ACK (client INVITE, Completed).
    pub retransmit_buffer: Option<Message>,

    /// Current retransmit interval for timers A/E/G, doubled on each fire.
    pub retransmit_interval: Duration,

    /// Active timers for this transaction, keyed by kind. Scheduling a new
    /// timer of a kind that already has one running replaces (and
    /// best-effort cancels) the old one.
    timers: HashMap<TimerKind, TimerHandle>,
}

impl Transaction {
    pub fn new_client(
        id: TransactionKey,
        kind: TransactionKind,
        initial_state: TransactionState,
        request: SipRequest,
        remote_addr: SocketAddr,
        reliable: bool,
        timer_settings: &TimerSettings,
    ) -> Self {
        Self {
            id,
            kind,
            state: AtomicTransactionState::new(initial_state),
            reliable,
            remote_addr,
            original_request: request,
            retransmit_buffer: None,
            retransmit_interval: timer_settings.t1,
            timers: HashMap::new(),
        }
    }

    pub fn new_server(
        id: TransactionKey,
        kind: TransactionKind,
        initial_state: TransactionState,
        request: SipRequest,
        remote_addr: SocketAddr,
        reliable: bool,
        timer_settings: &TimerSettings,
    ) -> Self {
        Self {
            id,
            kind,
            state: AtomicTransactionState::new(initial_state),
            reliable,
            remote_addr,
            original_request: request,
            retransmit_buffer: None,
            retransmit_interval: timer_settings.t1,
            timers: HashMap::new(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state.get()
    }

    /// Move to `new_state`, validating the edge against this transaction's
    /// per-machine transition table first. An invalid edge is logged and
    /// applied anyway: it signals a bug in the FSM that produced it, not
    /// bad input, so callers never see an `Err` here and the layer never
    /// aborts over it.
    pub fn set_state(&self, new_state: TransactionState) -> TransactionState {
        let prev = self.state.get();
        if let Err(e) = AtomicTransactionState::validate_transition(self.kind, prev, new_state) {
            tracing::warn!(tx_id = %self.id, kind = ?self.kind, error = %e, "illegal state transition");
        }
        self.state.set(new_state)
    }

    /// Record a freshly scheduled timer, replacing and best-effort
    /// cancelling any earlier one of the same kind.
    pub fn put_timer(&mut self, kind: TimerKind, handle: TimerHandle) {
        if let Some(old) = self.timers.insert(kind, handle) {
            old.cancel();
        }
    }

    pub fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timers.remove(&kind) {
            handle.cancel();
        }
    }

    pub fn cancel_all_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.cancel();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state.get())
            .field("reliable", &self.reliable)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}
