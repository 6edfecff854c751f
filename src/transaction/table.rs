//! The transaction table.
//!
//! A single-owner associative container keyed by [`TransactionKey`]. It is
//! accessed exclusively by the dispatcher task, so no internal locking is
//! needed — this is a thin `HashMap` wrapper, not a concurrent map.

use std::collections::HashMap;

use crate::transaction::data::Transaction;
use crate::transaction::key::TransactionKey;

/// Owns every live transaction, keyed by its [`TransactionKey`]. A key
/// appears at most once.
#[derive(Default)]
pub struct TransactionTable {
    transactions: HashMap<TransactionKey, Transaction>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self { transactions: HashMap::new() }
    }

    /// Insert a freshly created transaction. Returns the previous entry, if
    /// any shared the same id (this should never happen in practice — the
    /// dispatcher only inserts after a `find` miss — but the table does not
    /// enforce it itself).
    pub fn insert(&mut self, transaction: Transaction) -> Option<Transaction> {
        self.transactions.insert(transaction.id.clone(), transaction)
    }

    pub fn find(&self, id: &TransactionKey) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn find_mut(&mut self, id: &TransactionKey) -> Option<&mut Transaction> {
        self.transactions.get_mut(id)
    }

    /// Remove and return a transaction. Once removed, no later timer or
    /// message bearing its id may mutate it; callers
    /// that want a lingering absorber should use [`Self::move_to_stale`]
    /// instead.
    pub fn remove(&mut self, id: &TransactionKey) -> Option<Transaction> {
        self.transactions.remove(id)
    }

    /// Replace a transaction's in-place state without removing it from the
    /// table — used to transition a terminated entry into the `Stale`
    /// absorber rather than reaping it immediately.
    pub fn move_to_stale(&mut self, id: &TransactionKey) {
        if let Some(tx) = self.transactions.get_mut(id) {
            tx.cancel_all_timers();
            tx.set_state(crate::transaction::state::TransactionState::Stale);
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, id: &TransactionKey) -> bool {
        self.transactions.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Method, SipRequest, Via};
    use crate::timer::TimerSettings;
    use crate::transaction::key::TransactionKind;
    use crate::transaction::state::TransactionState;
    use std::net::SocketAddr;

    fn sample_transaction(branch: &str) -> Transaction {
        let via = Via::new(branch, "client.example.com", "UDP");
        let request = SipRequest::new(Method::Options, "sip:bob@example.com", via, "call-1", 1);
        let remote: SocketAddr = "127.0.0.1:5060".parse().unwrap();
        Transaction::new_client(
            TransactionKey::new(branch, Method::Options),
            TransactionKind::NonInviteClient,
            TransactionState::Initial,
            request,
            remote,
            false,
            &TimerSettings::default(),
        )
    }

    #[test]
    fn insert_then_find_round_trips() {
        let mut table = TransactionTable::new();
        let tx = sample_transaction("z9hG4bK-a");
        let id = tx.id.clone();
        assert!(table.insert(tx).is_none());
        assert!(table.find(&id).is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut table = TransactionTable::new();
        let tx = sample_transaction("z9hG4bK-b");
        let id = tx.id.clone();
        table.insert(tx);
        assert!(table.remove(&id).is_some());
        assert!(table.find(&id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn move_to_stale_keeps_entry_but_changes_state() {
        let mut table = TransactionTable::new();
        let tx = sample_transaction("z9hG4bK-c");
        let id = tx.id.clone();
        table.insert(tx);
        table.move_to_stale(&id);
        assert_eq!(table.find(&id).unwrap().state(), TransactionState::Stale);
        assert!(table.contains(&id));
    }
}
