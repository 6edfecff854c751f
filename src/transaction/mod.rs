//! Transaction identity, records, states, and the four state machines.

pub mod action;
pub mod data;
pub mod fsm;
pub mod inbound;
pub mod key;
pub mod state;
pub mod table;

pub use data::Transaction;
pub use inbound::{InboundMessage, Origin};
pub use key::{determine_transaction_kind, transaction_key_from_message, TransactionKey, TransactionKind};
pub use state::{AtomicTransactionState, TransactionState};
pub use table::TransactionTable;
