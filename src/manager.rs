//! The dispatcher and the `TransactionManager` that owns it.
//!
//! `TransactionManager` is the crate's public entry point. Constructing one
//! spawns a single dispatcher task that owns the transaction table
//! exclusively; every other handle in this crate only ever talks
//! to that task through channels.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::TransactionConfig;
use crate::error::{Error, Result};
use crate::events::TransactionEvent;
use crate::message::{Method, SipRequest, SipResponse};
use crate::timer::{TimerKind, TimerService, TimerSettings};
use crate::transaction::action::TransactionAction;
use crate::transaction::data::Transaction;
use crate::transaction::fsm;
use crate::transaction::inbound::{InboundMessage, Origin};
use crate::transaction::key::{
    determine_transaction_kind, transaction_key_for_request, transaction_key_for_response, TransactionKey, TransactionKind,
};
use crate::transaction::state::TransactionState;
use crate::transaction::table::TransactionTable;
use crate::transport::Transport;

/// Public entry point to the transaction layer.
///
/// Holds only what's needed to reach the dispatcher task it spawns on
/// construction: an input-queue sender and the transport handle (consulted
/// for `is_reliable()` when tagging freshly-originated messages). The
/// table, the timer service, and the TU sink all live inside the spawned
/// task.
pub struct TransactionManager {
    input_tx: mpsc::Sender<InboundMessage>,
    transport: Arc<dyn Transport>,
    dispatcher: JoinHandle<()>,
}

impl TransactionManager {
    /// Spawn a transaction manager over `transport`. Returns the manager
    /// handle plus the receiving half of the channel the TU listens on for
    /// [`TransactionEvent`]s.
    pub fn new(transport: Arc<dyn Transport>, config: TransactionConfig) -> (Self, mpsc::Receiver<TransactionEvent>) {
        let (input_tx, input_rx) = mpsc::channel(config.input_queue_capacity);
        let (tu_tx, tu_rx) = mpsc::channel(config.tu_event_capacity);
        let timers = TimerService::new(input_tx.clone());

        let dispatcher_transport = transport.clone();
        let dispatcher = tokio::spawn(run_dispatcher(input_rx, dispatcher_transport, timers, tu_tx, config));

        (Self { input_tx, transport, dispatcher }, tu_rx)
    }

    /// The TU asks that a fresh client transaction be created for `request`
    /// and sent to `destination`. The caller generates
    /// the branch; see [`crate::builders::generate_branch`].
    pub async fn send_request(&self, request: SipRequest, destination: SocketAddr) -> Result<TransactionKey> {
        let key =
            transaction_key_for_request(&request).ok_or_else(|| Error::MalformedMessage("request missing Via branch".into()))?;
        let reliable = self.transport.is_reliable();
        self.input_tx
            .send(InboundMessage::Request { request, origin: Origin::Tu, remote_addr: destination, reliable })
            .await
            .map_err(|_| Error::ChannelClosed("dispatcher input queue"))?;
        Ok(key)
    }

    /// The TU sends a response on behalf of an existing server transaction.
    pub async fn send_response(&self, response: SipResponse, destination: SocketAddr) -> Result<()> {
        self.input_tx
            .send(InboundMessage::Response { response, origin: Origin::Tu, remote_addr: destination })
            .await
            .map_err(|_| Error::ChannelClosed("dispatcher input queue"))
    }

    /// The transport selector delivers an inbound request.
    pub async fn receive_request(&self, request: SipRequest, remote_addr: SocketAddr) -> Result<()> {
        let reliable = self.transport.is_reliable();
        self.input_tx
            .send(InboundMessage::Request { request, origin: Origin::Transport, remote_addr, reliable })
            .await
            .map_err(|_| Error::ChannelClosed("dispatcher input queue"))
    }

    /// The transport selector delivers an inbound response.
    pub async fn receive_response(&self, response: SipResponse, remote_addr: SocketAddr) -> Result<()> {
        self.input_tx
            .send(InboundMessage::Response { response, origin: Origin::Transport, remote_addr })
            .await
            .map_err(|_| Error::ChannelClosed("dispatcher input queue"))
    }

    /// The transport selector reports a send failure for a transaction.
    pub async fn notify_transport_error(&self, tx_id: TransactionKey) -> Result<()> {
        self.input_tx
            .send(InboundMessage::TransportError { tx_id })
            .await
            .map_err(|_| Error::ChannelClosed("dispatcher input queue"))
    }

    /// Stop the dispatcher task. Ungraceful: in-flight timers belonging to
    /// still-live transactions are simply abandoned. Suitable for process
    /// teardown or test cleanup.
    pub async fn shutdown(&self) {
        self.dispatcher.abort();
    }
}

/// The single consumer loop: pulls one message at a time
/// off `input_rx` and serializes every transition of the transaction it
/// belongs to. Nothing here blocks on I/O; sends to the transport and TU
/// are queued, non-blocking operations from the dispatcher's point of view.
async fn run_dispatcher(
    mut input_rx: mpsc::Receiver<InboundMessage>,
    transport: Arc<dyn Transport>,
    timers: TimerService,
    tu_tx: mpsc::Sender<TransactionEvent>,
    config: TransactionConfig,
) {
    let mut table = TransactionTable::new();
    let settings = config.timers;

    while let Some(message) = input_rx.recv().await {
        match message {
            InboundMessage::Request { request, origin, remote_addr, reliable } => {
                handle_request(&mut table, &timers, &transport, &tu_tx, &settings, config.discard_stray_responses, request, origin, remote_addr, reliable)
                    .await;
            }
            InboundMessage::Response { response, origin, remote_addr } => {
                handle_response(&mut table, &timers, &transport, &tu_tx, &settings, config.discard_stray_responses, response, origin, remote_addr)
                    .await;
            }
            InboundMessage::TimerExpiry { tx_id, kind } => {
                handle_timer(&mut table, &timers, &transport, &tu_tx, &settings, tx_id, kind).await;
            }
            InboundMessage::TransportError { tx_id } => {
                handle_transport_error(&mut table, &timers, &transport, &tu_tx, &settings, tx_id).await;
            }
        }
    }

    trace!("dispatcher input queue closed, shutting down");
}

/// Route a message already known to belong to `tx` to the handler for its
/// machine kind, except when `tx` has already moved to the
/// absorbing `Stale` state, in which case everything bearing
/// its id is discarded by the stale handler regardless of machine kind.
fn dispatch_to_fsm(tx: &mut Transaction, kind: TransactionKind, msg: InboundMessage, settings: &TimerSettings) -> Vec<TransactionAction> {
    if tx.state() == TransactionState::Stale {
        return fsm::stale::on_message(tx, msg);
    }
    match kind {
        TransactionKind::InviteClient => fsm::client_invite::on_message(tx, msg, settings),
        TransactionKind::NonInviteClient => fsm::client_non_invite::on_message(tx, msg, settings),
        TransactionKind::InviteServer => fsm::server_invite::on_message(tx, msg, settings),
        TransactionKind::NonInviteServer => fsm::server_non_invite::on_message(tx, msg, settings),
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_request(
    table: &mut TransactionTable,
    timers: &TimerService,
    transport: &Arc<dyn Transport>,
    tu_tx: &mpsc::Sender<TransactionEvent>,
    settings: &TimerSettings,
    _discard_stray_responses: bool,
    request: SipRequest,
    origin: Origin,
    remote_addr: SocketAddr,
    reliable: bool,
) {
    let Some(key) = transaction_key_for_request(&request) else {
        warn!("dropping malformed request: no Via branch");
        return;
    };

    if let Some(tx) = table.find_mut(&key) {
        let kind = tx.kind;
        let msg = InboundMessage::Request { request, origin, remote_addr, reliable: tx.reliable };
        let actions = dispatch_to_fsm(tx, kind, msg, settings);
        apply_actions(table, timers, transport, tu_tx, settings, &key, actions).await;
        return;
    }

    match origin {
        Origin::Transport => {
            // An ACK with no matching transaction acknowledges a 2xx — that's
            // a dialog-layer message, not a transaction one; forward it to
            // the TU directly instead of spinning up a transaction for it.
            if request.method == Method::Ack {
                debug!(tx_id = %key, "unmatched ACK, forwarding to TU as a 2xx ACK");
                let _ = tu_tx.send(TransactionEvent::DeliverRequest { transaction_id: key, request }).await;
                return;
            }

            let kind = determine_transaction_kind(&request.method, true);
            // INVITE server transactions start in Proceeding, not Trying;
            // constructing directly in the right state (rather than
            // constructing in Trying and promoting) keeps every transition
            // this machine makes valid against its own table.
            let initial_state = if kind == TransactionKind::InviteServer { TransactionState::Proceeding } else { TransactionState::Trying };
            let tx = Transaction::new_server(key.clone(), kind, initial_state, request.clone(), remote_addr, reliable, settings);
            let mut actions = vec![TransactionAction::DeliverRequestToTu(request)];
            if kind == TransactionKind::InviteServer {
                // Schedule the Trying timer to emit a 100 on the TU's behalf
                // if it stays quiet too long.
                actions.push(TransactionAction::ScheduleTimer { kind: TimerKind::Trying, duration: settings.send_100_trying_delay });
            }
            table.insert(tx);
            apply_actions(table, timers, transport, tu_tx, settings, &key, actions).await;
        }
        Origin::Tu => {
            let kind = determine_transaction_kind(&request.method, false);
            let mut tx = Transaction::new_client(key.clone(), kind, TransactionState::Initial, request, remote_addr, reliable, settings);
            let actions = match kind {
                TransactionKind::InviteClient => fsm::client_invite::start(&mut tx, settings),
                TransactionKind::NonInviteClient => fsm::client_non_invite::start(&mut tx, settings),
                TransactionKind::InviteServer | TransactionKind::NonInviteServer => {
                    unreachable!("determine_transaction_kind(_, false) only produces client kinds")
                }
            };
            table.insert(tx);
            apply_actions(table, timers, transport, tu_tx, settings, &key, actions).await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_response(
    table: &mut TransactionTable,
    timers: &TimerService,
    transport: &Arc<dyn Transport>,
    tu_tx: &mpsc::Sender<TransactionEvent>,
    settings: &TimerSettings,
    discard_stray_responses: bool,
    response: SipResponse,
    origin: Origin,
    remote_addr: SocketAddr,
) {
    let Some(key) = transaction_key_for_response(&response) else {
        warn!("dropping malformed response: no Via branch or CSeq");
        return;
    };

    if let Some(tx) = table.find_mut(&key) {
        let kind = tx.kind;
        let msg = InboundMessage::Response { response, origin, remote_addr };
        let actions = dispatch_to_fsm(tx, kind, msg, settings);
        apply_actions(table, timers, transport, tu_tx, settings, &key, actions).await;
        return;
    }

    // Stray response: matches no transaction.
    if discard_stray_responses {
        debug!(tx_id = %key, "dropping stray response, no matching transaction");
    } else {
        let _ = tu_tx.send(TransactionEvent::DeliverResponse { transaction_id: None, response }).await;
    }
}

async fn handle_timer(
    table: &mut TransactionTable,
    timers: &TimerService,
    transport: &Arc<dyn Transport>,
    tu_tx: &mpsc::Sender<TransactionEvent>,
    settings: &TimerSettings,
    tx_id: TransactionKey,
    kind: TimerKind,
) {
    let Some(tx) = table.find_mut(&tx_id) else {
        // Late-cancel race: a cancelled timer may still fire
        // after its transaction is gone. Absorb it.
        trace!(tx_id = %tx_id, timer = %kind, "timer fired for unknown/destroyed transaction, absorbing");
        return;
    };
    let machine_kind = tx.kind;
    let msg = InboundMessage::TimerExpiry { tx_id: tx_id.clone(), kind };
    let actions = dispatch_to_fsm(tx, machine_kind, msg, settings);
    apply_actions(table, timers, transport, tu_tx, settings, &tx_id, actions).await;
}

async fn handle_transport_error(
    table: &mut TransactionTable,
    timers: &TimerService,
    transport: &Arc<dyn Transport>,
    tu_tx: &mpsc::Sender<TransactionEvent>,
    settings: &TimerSettings,
    tx_id: TransactionKey,
) {
    let Some(tx) = table.find_mut(&tx_id) else {
        trace!(tx_id = %tx_id, "transport error for unknown/destroyed transaction, absorbing");
        return;
    };
    let machine_kind = tx.kind;
    let msg = InboundMessage::TransportError { tx_id: tx_id.clone() };
    let actions = dispatch_to_fsm(tx, machine_kind, msg, settings);
    apply_actions(table, timers, transport, tu_tx, settings, &tx_id, actions).await;
}

/// Carry out the actions an FSM step handed back. `Terminate` is interpreted here,
/// rather than by the FSM, into either an immediate removal or a detour
/// through the `Stale` absorber — a transaction already in
/// `Stale` when `Terminate` fires (its `StaleExpiry` timer) is removed for
/// good; everything else on an unreliable transport lingers for one `T4`
/// first.
async fn apply_actions(
    table: &mut TransactionTable,
    timers: &TimerService,
    transport: &Arc<dyn Transport>,
    tu_tx: &mpsc::Sender<TransactionEvent>,
    settings: &TimerSettings,
    tx_id: &TransactionKey,
    actions: Vec<TransactionAction>,
) {
    for action in actions {
        match action {
            TransactionAction::SendToTransport(message) => {
                let Some(remote_addr) = table.find(tx_id).map(|tx| tx.remote_addr) else { continue };
                if let Err(e) = transport.send(message, remote_addr).await {
                    warn!(tx_id = %tx_id, error = %e, "transport send failed");
                    let _ = tu_tx.send(TransactionEvent::TransportFailed { transaction_id: tx_id.clone() }).await;
                }
            }
            TransactionAction::DeliverRequestToTu(request) => {
                let _ = tu_tx.send(TransactionEvent::DeliverRequest { transaction_id: tx_id.clone(), request }).await;
            }
            TransactionAction::DeliverResponseToTu(response) => {
                let _ = tu_tx.send(TransactionEvent::DeliverResponse { transaction_id: Some(tx_id.clone()), response }).await;
            }
            TransactionAction::NotifyTimeout => {
                let _ = tu_tx.send(TransactionEvent::TransactionTimeout { transaction_id: tx_id.clone() }).await;
            }
            TransactionAction::NotifyTransportFailed => {
                let _ = tu_tx.send(TransactionEvent::TransportFailed { transaction_id: tx_id.clone() }).await;
            }
            TransactionAction::ScheduleTimer { kind, duration } => {
                // Reliable-transport suppression: a
                // zero duration means "do not schedule" at all.
                if duration.is_zero() {
                    continue;
                }
                let handle = timers.schedule(tx_id.clone(), kind, duration);
                if let Some(tx) = table.find_mut(tx_id) {
                    tx.put_timer(kind, handle);
                } else {
                    handle.cancel();
                }
            }
            TransactionAction::CancelTimer(kind) => {
                if let Some(tx) = table.find_mut(tx_id) {
                    tx.cancel_timer(kind);
                }
            }
            TransactionAction::CancelAllTimers => {
                if let Some(tx) = table.find_mut(tx_id) {
                    tx.cancel_all_timers();
                }
            }
            TransactionAction::MoveToStale => {
                move_to_stale(table, timers, settings, tx_id);
            }
            TransactionAction::Terminate => {
                let already_stale = table.find(tx_id).map(|tx| tx.state() == TransactionState::Stale).unwrap_or(true);
                let reliable = table.find(tx_id).map(|tx| tx.reliable).unwrap_or(true);
                if already_stale || reliable {
                    table.remove(tx_id);
                } else {
                    move_to_stale(table, timers, settings, tx_id);
                }
            }
        }
    }
}

fn move_to_stale(table: &mut TransactionTable, timers: &TimerService, settings: &TimerSettings, tx_id: &TransactionKey) {
    table.move_to_stale(tx_id);
    let handle = timers.schedule(tx_id.clone(), TimerKind::StaleExpiry, settings.t4);
    if let Some(tx) = table.find_mut(tx_id) {
        tx.put_timer(TimerKind::StaleExpiry, handle);
    } else {
        handle.cancel();
    }
}
