//! Client INVITE transaction (RFC 3261 §17.1.1.2).
//!
//! `Calling -> Proceeding -> Completed -> Terminated`. A 2xx final response
//! terminates the transaction directly: ACK for a 2xx is the TU's
//! responsibility (it rides a dialog, not this transaction) and is never
//! generated here.

use crate::builders::create_ack_from_invite;
use crate::message::{Message, SipResponse};
use crate::timer::{TimerKind, TimerSettings};
use crate::transaction::action::TransactionAction;
use crate::transaction::data::Transaction;
use crate::transaction::inbound::{InboundMessage, Origin};
use crate::transaction::state::TransactionState;

/// Kick off the transaction: store the INVITE as the retransmit buffer,
/// send it, schedule timer B always and timer A only over an unreliable
/// transport.
pub fn start(tx: &mut Transaction, settings: &TimerSettings) -> Vec<TransactionAction> {
    let mut actions = Vec::new();
    tx.retransmit_buffer = Some(Message::Request(tx.original_request.clone()));
    tx.retransmit_interval = settings.t1;
    actions.push(TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap()));
    if !tx.reliable {
        actions.push(TransactionAction::ScheduleTimer {
            kind: TimerKind::A,
            duration: settings.t1,
        });
    }
    actions.push(TransactionAction::ScheduleTimer {
        kind: TimerKind::B,
        duration: settings.timer_b(),
    });
    tx.set_state(TransactionState::Calling);
    actions
}

pub fn on_message(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match tx.state() {
        TransactionState::Calling => on_calling(tx, msg, settings),
        TransactionState::Proceeding => on_proceeding(tx, msg, settings),
        TransactionState::Completed => on_completed(tx, msg),
        _ => Vec::new(),
    }
}

fn on_calling(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::TimerExpiry { kind: TimerKind::A, .. } => {
            let mut actions = vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())];
            // Timer A doubles uncapped for the lifetime of Calling.
            tx.retransmit_interval = settings.next_retransmit(tx.retransmit_interval, false);
            actions.push(TransactionAction::ScheduleTimer {
                kind: TimerKind::A,
                duration: tx.retransmit_interval,
            });
            actions
        }
        InboundMessage::TimerExpiry { kind: TimerKind::B, .. } => {
            vec![TransactionAction::CancelAllTimers, TransactionAction::NotifyTimeout, TransactionAction::Terminate]
        }
        InboundMessage::Response { response, origin: Origin::Transport, .. } if response.is_provisional() => {
            tx.set_state(TransactionState::Proceeding);
            vec![TransactionAction::CancelTimer(TimerKind::A), TransactionAction::DeliverResponseToTu(response)]
        }
        InboundMessage::Response { response, origin: Origin::Transport, .. } if response.is_final() => {
            on_final_response(tx, response, settings)
        }
        InboundMessage::Response { origin: Origin::Tu, .. } => {
            tracing::warn!(tx_id = %tx.id, "dropping response delivered to a client transaction");
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn on_proceeding(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::TimerExpiry { kind: TimerKind::B, .. } => {
            vec![TransactionAction::CancelAllTimers, TransactionAction::NotifyTimeout, TransactionAction::Terminate]
        }
        InboundMessage::Response { response, origin: Origin::Transport, .. } if response.is_provisional() => {
            vec![TransactionAction::DeliverResponseToTu(response)]
        }
        InboundMessage::Response { response, origin: Origin::Transport, .. } if response.is_final() => {
            on_final_response(tx, response, settings)
        }
        InboundMessage::Response { origin: Origin::Tu, .. } => {
            tracing::warn!(tx_id = %tx.id, "dropping response delivered to a client transaction");
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn on_final_response(tx: &mut Transaction, response: SipResponse, settings: &TimerSettings) -> Vec<TransactionAction> {
    let mut actions = vec![TransactionAction::CancelAllTimers];
    if response.is_success() {
        actions.push(TransactionAction::DeliverResponseToTu(response));
        tx.set_state(TransactionState::Terminated);
        actions.push(TransactionAction::Terminate);
    } else {
        let ack = create_ack_from_invite(&tx.original_request, &response);
        tx.retransmit_buffer = Some(Message::Request(ack.clone()));
        actions.push(TransactionAction::DeliverResponseToTu(response));
        actions.push(TransactionAction::SendToTransport(Message::Request(ack)));
        if tx.reliable {
            tx.set_state(TransactionState::Terminated);
            actions.push(TransactionAction::Terminate);
        } else {
            tx.set_state(TransactionState::Completed);
            actions.push(TransactionAction::ScheduleTimer {
                kind: TimerKind::D,
                duration: settings.timer_d(false),
            });
        }
    }
    actions
}

/// Completed re-sends the stored ACK on a retransmitted failure final, and
/// never re-notifies the TU.
fn on_completed(_tx: &mut Transaction, msg: InboundMessage) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::Response { origin: Origin::Transport, .. } => {
            vec![TransactionAction::SendToTransport(_tx.retransmit_buffer.clone().unwrap())]
        }
        InboundMessage::TimerExpiry { kind: TimerKind::D, .. } => vec![TransactionAction::Terminate],
        InboundMessage::TransportError { .. } => {
            vec![TransactionAction::NotifyTransportFailed, TransactionAction::Terminate]
        }
        _ => Vec::new(),
    }
}
