//! RFC 3261 §17 SIP transaction layer: the four client/server INVITE and
//! non-INVITE finite state machines, transaction identity, retransmission
//! under timers, and the dispatcher that routes inbound messages to
//! transaction instances.
//!
//! SIP message parsing, SDP handling, the Transaction User, and the
//! transport selector itself are external collaborators; this crate
//! defines only the narrow contracts it needs from them (`message`,
//! `transport::Transport`) and builds everything above that line.

pub mod builders;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod message;
pub mod timer;
pub mod transaction;
pub mod transport;

pub use config::TransactionConfig;
pub use error::{Error, Result};
pub use events::TransactionEvent;
pub use manager::TransactionManager;
pub use message::{Message, Method, SipRequest, SipResponse, Via};
pub use timer::{TimerKind, TimerSettings};
pub use transaction::{Transaction, TransactionKey, TransactionKind, TransactionState};
pub use transport::Transport;
