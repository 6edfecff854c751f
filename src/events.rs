//! Events delivered to the Transaction User.

use crate::message::{SipRequest, SipResponse};
use crate::transaction::key::TransactionKey;
use crate::transaction::state::TransactionState;

/// Everything the Transaction User can observe about a transaction.
///
/// The TU observes exactly one of {response delivered, `TransactionTimeout`,
/// `TransportFailed`} per client transaction it initiated. `StateChanged` is
/// additional, ambient observability (useful for logging/metrics/testing)
/// and does not count against that exactly-one guarantee.
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// A request was forwarded to the TU (server transaction creation, or a
    /// stray request being dispatched statelessly — this layer only ever
    /// produces the former).
    DeliverRequest {
        transaction_id: TransactionKey,
        request: SipRequest,
    },
    /// A response was forwarded to the TU: either the one final answer to
    /// a client transaction, or (with `discard_stray_responses = false`) a
    /// stray response forwarded statelessly.
    DeliverResponse {
        transaction_id: Option<TransactionKey>,
        response: SipResponse,
    },
    /// Ambient observability: a transaction changed state. Never the TU's
    /// only signal for an outcome — see `TransactionTimeout`/
    /// `TransportFailed` for that.
    StateChanged {
        transaction_id: TransactionKey,
        previous_state: TransactionState,
        new_state: TransactionState,
    },
    /// The request never received a final response within 64*T1 (Timer
    /// B/F) or the server never heard an ACK in time (Timer H).
    TransactionTimeout { transaction_id: TransactionKey },
    /// The transport reported a send failure while the transaction still
    /// required the wire.
    TransportFailed { transaction_id: TransactionKey },
}
