//! Server non-INVITE transaction (RFC 3261 §17.2.2).
//!
//! `Trying -> Proceeding -> Completed -> Terminated`. Creation (forwarding
//! the initial request to the TU and entering `Trying`) is the
//! dispatcher's job, not this module's — by the time a message reaches
//! `on_message` the transaction already exists.

use tracing::warn;

use crate::message::Message;
use crate::timer::{TimerKind, TimerSettings};
use crate::transaction::action::TransactionAction;
use crate::transaction::data::Transaction;
use crate::transaction::inbound::{InboundMessage, Origin};
use crate::transaction::state::TransactionState;

pub fn on_message(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match tx.state() {
        TransactionState::Trying => on_trying(tx, msg, settings),
        TransactionState::Proceeding => on_proceeding(tx, msg, settings),
        TransactionState::Completed => on_completed(tx, msg),
        _ => Vec::new(),
    }
}

fn on_trying(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_provisional() => {
            let message = Message::Response(response);
            tx.retransmit_buffer = Some(message.clone());
            tx.set_state(TransactionState::Proceeding);
            vec![TransactionAction::SendToTransport(message)]
        }
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_final() => {
            on_final_from_tu(tx, response, settings)
        }
        InboundMessage::Response { origin: Origin::Transport, .. } => {
            warn!(tx_id = %tx.id, "dropping response delivered to a server transaction");
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn on_proceeding(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::Request { .. } => {
            vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())]
        }
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_provisional() => {
            let message = Message::Response(response);
            tx.retransmit_buffer = Some(message.clone());
            vec![TransactionAction::SendToTransport(message)]
        }
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_final() => {
            on_final_from_tu(tx, response, settings)
        }
        InboundMessage::Response { origin: Origin::Transport, .. } => {
            warn!(tx_id = %tx.id, "dropping response delivered to a server transaction");
            Vec::new()
        }
        InboundMessage::TransportError { .. } => {
            vec![TransactionAction::NotifyTransportFailed, TransactionAction::Terminate]
        }
        _ => Vec::new(),
    }
}

fn on_final_from_tu(tx: &mut Transaction, response: crate::message::SipResponse, settings: &TimerSettings) -> Vec<TransactionAction> {
    let message = Message::Response(response);
    tx.retransmit_buffer = Some(message.clone());
    let mut actions = vec![TransactionAction::SendToTransport(message)];
    if tx.reliable {
        tx.set_state(TransactionState::Terminated);
        actions.push(TransactionAction::Terminate);
    } else {
        tx.set_state(TransactionState::Completed);
        actions.push(TransactionAction::ScheduleTimer {
            kind: TimerKind::J,
            duration: settings.timer_j(false),
        });
    }
    actions
}

fn on_completed(tx: &mut Transaction, msg: InboundMessage) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::Request { .. } => {
            vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())]
        }
        InboundMessage::TimerExpiry { kind: TimerKind::J, .. } => vec![TransactionAction::Terminate],
        InboundMessage::TransportError { .. } => {
            vec![TransactionAction::NotifyTransportFailed, TransactionAction::Terminate]
        }
        _ => Vec::new(),
    }
}
