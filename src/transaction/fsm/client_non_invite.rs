//! Client non-INVITE transaction (RFC 3261 §17.1.2.2).
//!
//! `Trying -> Proceeding -> Completed -> Terminated`.

use crate::message::Message;
use crate::timer::{TimerKind, TimerSettings};
use crate::transaction::action::TransactionAction;
use crate::transaction::data::Transaction;
use crate::transaction::inbound::{InboundMessage, Origin};
use crate::transaction::state::TransactionState;

/// Kick off the transaction: store the request as the retransmit buffer,
/// send it, and schedule timers E (retransmit) and F (timeout) — timer E
/// only on an unreliable transport.
pub fn start(tx: &mut Transaction, settings: &TimerSettings) -> Vec<TransactionAction> {
    let mut actions = Vec::new();
    tx.retransmit_buffer = Some(Message::Request(tx.original_request.clone()));
    tx.retransmit_interval = settings.t1;
    actions.push(TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap()));
    if !tx.reliable {
        actions.push(TransactionAction::ScheduleTimer {
            kind: TimerKind::E,
            duration: settings.t1,
        });
    }
    actions.push(TransactionAction::ScheduleTimer {
        kind: TimerKind::F,
        duration: settings.timer_f(),
    });
    tx.set_state(TransactionState::Trying);
    actions
}

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
        InboundMessage::TimerExpiry { kind: TimerKind::E, .. } => {
            let mut actions = vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())];
            tx.retransmit_interval = settings.next_retransmit(tx.retransmit_interval, true);
            actions.push(TransactionAction::ScheduleTimer {
                kind: TimerKind::E,
                duration: tx.retransmit_interval,
            });
            actions
        }
        InboundMessage::TimerExpiry { kind: TimerKind::F, .. } => {
            vec![TransactionAction::CancelAllTimers, TransactionAction::NotifyTimeout, TransactionAction::Terminate]
        }
        InboundMessage::Response { response, origin: Origin::Transport, .. } if response.is_provisional() => {
            tx.set_state(TransactionState::Proceeding);
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

fn on_proceeding(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::TimerExpiry { kind: TimerKind::E, .. } => {
            let mut actions = vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())];
            // Once in Proceeding, E reschedules flat at T2, not doubled further.
            tx.retransmit_interval = settings.t2;
            actions.push(TransactionAction::ScheduleTimer {
                kind: TimerKind::E,
                duration: settings.t2,
            });
            actions
        }
        InboundMessage::TimerExpiry { kind: TimerKind::F, .. } => {
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

fn on_final_response(tx: &mut Transaction, response: crate::message::SipResponse, settings: &TimerSettings) -> Vec<TransactionAction> {
    let mut actions = vec![TransactionAction::DeliverResponseToTu(response), TransactionAction::CancelAllTimers];
    if tx.reliable {
        tx.set_state(TransactionState::Terminated);
        actions.push(TransactionAction::Terminate);
    } else {
        tx.set_state(TransactionState::Completed);
        actions.push(TransactionAction::ScheduleTimer {
            kind: TimerKind::K,
            duration: settings.timer_k(false),
        });
    }
    actions
}

/// Completed absorbs retransmitted finals silently.
fn on_completed(_tx: &mut Transaction, msg: InboundMessage) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::TimerExpiry { kind: TimerKind::K, .. } => {
            vec![TransactionAction::Terminate]
        }
        InboundMessage::Response { origin: Origin::Transport, .. } => Vec::new(),
        _ => Vec::new(),
    }
}
