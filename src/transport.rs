//! The transport selector contract.
//!
//! Transport itself — UDP/TCP/TLS sockets, DNS/SRV resolution — is an
//! external collaborator. This module defines only the narrow
//! `send`/failure-reporting contract the transaction layer depends on,
//! shaped after a typical SIP transport selector's send/failure-reporting
//! surface (`send`, `local_addr`, reliability), trimmed to what a
//! transaction actually calls.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::message::Message;

/// Result type returned by transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A transport-layer failure, reported back into the dispatcher's input
/// queue as `InboundMessage::TransportError` rather than propagated
/// synchronously.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport send failed: {0}")]
pub struct TransportError(pub String);

/// The transport selector's send contract.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a message to `destination`. Asynchronous; failures surface via
    /// the input queue, not this call's return value alone, but the
    /// `Result` lets the manager log the immediate failure too.
    async fn send(&self, message: Message, destination: SocketAddr) -> TransportResult<()>;

    /// Whether this transport instance provides reliable, in-order,
    /// at-most-once delivery (TCP/TLS/SCTP) or not (UDP). Transactions
    /// capture this once at creation.
    fn is_reliable(&self) -> bool;

    fn local_addr(&self) -> SocketAddr;
}
