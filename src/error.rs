//! Error types for the transaction layer.

use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the transaction layer.
///
/// Most of these never reach the Transaction User directly; a
/// transaction-internal error is either absorbed (logged and dropped, as
/// `MalformedMessage` always is) or turned into a
/// `TransactionEvent::TransportFailed` delivered to the TU.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A message could not be assigned a transaction id (missing/invalid
    /// branch, missing CSeq on a response, etc).
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// An internal channel (input queue, transport sink, TU sink) was
    /// dropped by its receiver.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// The transport selector reported a send failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The timer service failed to schedule a timer.
    #[error("timer error: {0}")]
    Timer(String),

    /// No transaction exists for the given id.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),

    /// An FSM was asked to make a transition it does not define for its
    /// current state; the triggering message is logged and dropped.
    #[error("invalid transition for {tx_id}: {from} -> {to}")]
    InvalidTransition {
        tx_id: String,
        from: String,
        to: String,
    },

    /// Invalid configuration supplied to the manager.
    #[error("configuration error: {0}")]
    Config(String),
}
