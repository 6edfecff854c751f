//! The tagged-variant inbound message type consumed by the dispatcher.
//!
//! One enum covers every event an FSM can react to — an inbound request, an
//! inbound response, a timer firing, or a transport failure — so dispatch
//! is an exhaustive pattern match rather than a chain of type checks.

use std::net::SocketAddr;

use crate::message::{SipRequest, SipResponse};
use crate::timer::TimerKind;
use crate::transaction::key::TransactionKey;

/// Which side a request/response arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Transport,
    Tu,
}

/// One item pulled off the dispatcher's single input queue.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Request {
        request: SipRequest,
        origin: Origin,
        remote_addr: SocketAddr,
        /// Whether the transport this arrived on/will be sent on is
        /// reliable. Set once at transaction creation and
        /// carried on every subsequent delivery tagged with the same id
        /// for convenience; the dispatcher only trusts the value stored on
        /// the transaction record once one exists.
        reliable: bool,
    },
    Response {
        response: SipResponse,
        origin: Origin,
        remote_addr: SocketAddr,
    },
    TimerExpiry {
        tx_id: TransactionKey,
        kind: TimerKind,
    },
    TransportError {
        tx_id: TransactionKey,
    },
}
