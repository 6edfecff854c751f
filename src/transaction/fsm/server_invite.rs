//! Server INVITE transaction (RFC 3261 §17.2.1).
//!
//! `Proceeding -> Completed -> Confirmed -> Terminated`. A 2xx final
//! response terminates the transaction immediately: 2xx retransmission is
//! the TU's responsibility (it rides the dialog layer), not this
//! transaction's.

use tracing::warn;

use crate::builders::create_trying_response;
use crate::message::{Message, Method};
use crate::timer::{TimerKind, TimerSettings};
use crate::transaction::action::TransactionAction;
use crate::transaction::data::Transaction;
use crate::transaction::inbound::{InboundMessage, Origin};
use crate::transaction::state::TransactionState;

pub fn on_message(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match tx.state() {
        TransactionState::Proceeding => on_proceeding(tx, msg, settings),
        TransactionState::Completed => on_completed(tx, msg, settings),
        TransactionState::Confirmed => on_confirmed(tx, msg),
        _ => Vec::new(),
    }
}

fn on_proceeding(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        // Local extension: the TU has been silent past the 100-Trying
        // window; auto-emit 100 Trying on its behalf.
        InboundMessage::TimerExpiry { kind: TimerKind::Trying, .. } => {
            if tx.retransmit_buffer.is_some() {
                return Vec::new();
            }
            let trying = create_trying_response(&tx.original_request);
            let message = Message::Response(trying);
            tx.retransmit_buffer = Some(message.clone());
            vec![TransactionAction::SendToTransport(message)]
        }
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_provisional() => {
            let message = Message::Response(response);
            tx.retransmit_buffer = Some(message.clone());
            vec![TransactionAction::CancelTimer(TimerKind::Trying), TransactionAction::SendToTransport(message)]
        }
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_success() => {
            let message = Message::Response(response);
            tx.set_state(TransactionState::Terminated);
            vec![
                TransactionAction::CancelTimer(TimerKind::Trying),
                TransactionAction::SendToTransport(message),
                TransactionAction::Terminate,
            ]
        }
        InboundMessage::Response { response, origin: Origin::Tu, .. } if response.is_failure() => {
            let message = Message::Response(response);
            tx.retransmit_buffer = Some(message.clone());
            let mut actions = vec![TransactionAction::CancelTimer(TimerKind::Trying), TransactionAction::SendToTransport(message)];
            if !tx.reliable {
                actions.push(TransactionAction::ScheduleTimer {
                    kind: TimerKind::G,
                    duration: settings.t1,
                });
            }
            actions.push(TransactionAction::ScheduleTimer {
                kind: TimerKind::H,
                duration: settings.timer_h(),
            });
            tx.set_state(TransactionState::Completed);
            actions
        }
        InboundMessage::Response { origin: Origin::Transport, .. } => {
            warn!(tx_id = %tx.id, "dropping response delivered to a server transaction");
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn on_completed(tx: &mut Transaction, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::Request { request, .. } if request.method == Method::Invite => {
            vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())]
        }
        InboundMessage::Request { request, .. } if request.method == Method::Ack => {
            let mut actions = vec![TransactionAction::CancelTimer(TimerKind::G), TransactionAction::CancelTimer(TimerKind::H)];
            if tx.reliable {
                tx.set_state(TransactionState::Terminated);
                actions.push(TransactionAction::Terminate);
            } else {
                tx.set_state(TransactionState::Confirmed);
                actions.push(TransactionAction::ScheduleTimer {
                    kind: TimerKind::I,
                    duration: settings.timer_i(false),
                });
            }
            actions
        }
        InboundMessage::TimerExpiry { kind: TimerKind::G, .. } => {
            let mut actions = vec![TransactionAction::SendToTransport(tx.retransmit_buffer.clone().unwrap())];
            tx.retransmit_interval = settings.next_retransmit(tx.retransmit_interval, true);
            actions.push(TransactionAction::ScheduleTimer {
                kind: TimerKind::G,
                duration: tx.retransmit_interval,
            });
            actions
        }
        InboundMessage::TimerExpiry { kind: TimerKind::H, .. } => {
            vec![TransactionAction::CancelAllTimers, TransactionAction::NotifyTimeout, TransactionAction::Terminate]
        }
        InboundMessage::TransportError { .. } => {
            vec![TransactionAction::NotifyTransportFailed, TransactionAction::Terminate]
        }
        _ => Vec::new(),
    }
}

/// Confirmed absorbs ACK retransmits silently.
fn on_confirmed(_tx: &mut Transaction, msg: InboundMessage) -> Vec<TransactionAction> {
    match msg {
        InboundMessage::TimerExpiry { kind: TimerKind::I, .. } => vec![TransactionAction::Terminate],
        InboundMessage::Request { .. } => Vec::new(),
        _ => Vec::new(),
    }
}
