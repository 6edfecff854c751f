//! Stale absorber.
//!
//! A terminal holding state for a destroyed transaction whose id might
//! still see late duplicates on an unreliable transport. Everything
//! bearing its id is silently discarded for one `T4` interval; this
//! replaces RFC 3261's instantaneous "Terminated" reaping and protects
//! against a same-id resurrection racing a late duplicate.

use crate::timer::TimerKind;
use crate::transaction::action::TransactionAction;
use crate::transaction::data::Transaction;
use crate::transaction::inbound::InboundMessage;

pub fn on_message(_tx: &mut Transaction, msg: InboundMessage) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::TimerExpiry { kind: TimerKind::StaleExpiry, .. } => vec![TransactionAction::Terminate],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Method, SipRequest, Via};
    use crate::timer::TimerSettings;
    use crate::transaction::inbound::Origin;
    use crate::transaction::key::{TransactionKey, TransactionKind};
    use crate::transaction::state::TransactionState;
    use std::net::SocketAddr;

    fn make_tx() -> Transaction {
        let via = Via::new("z9hG4bK-stale", "client.example.com", "UDP");
        let request = SipRequest::new(Method::Register, "sip:registrar.example.com", via, "call-1", 1);
        let remote: SocketAddr = "127.0.0.1:5060".parse().unwrap();
        Transaction::new_server(
            TransactionKey::new("z9hG4bK-stale", Method::Register),
            TransactionKind::NonInviteServer,
            TransactionState::Stale,
            request,
            remote,
            false,
            &TimerSettings::default(),
        )
    }

    #[test]
    fn absorbs_late_retransmits() {
        let mut tx = make_tx();
        let msg = InboundMessage::Request {
            request: SipRequest::new(Method::Register, "sip:registrar.example.com", Via::new("z9hG4bK-stale", "x", "UDP"), "call-1", 1),
            origin: Origin::Transport,
            remote_addr: "127.0.0.1:5060".parse().unwrap(),
            reliable: false,
        };
        assert!(on_message(&mut tx, msg).is_empty());
    }

    #[test]
    fn stale_expiry_terminates() {
        let mut tx = make_tx();
        let actions = on_message(&mut tx, InboundMessage::TimerExpiry { tx_id: tx.id.clone(), kind: TimerKind::StaleExpiry });
        assert!(matches!(actions.as_slice(), [TransactionAction::Terminate]));
    }
}
