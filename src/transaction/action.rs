//! Actions an FSM step hands back to the dispatcher.
//!
//! Table-driven ownership: the table owns the transaction; FSMs return an
//! action enum including `Terminate`, and the dispatcher removes the entry
//! after the handler returns. `TransactionAction` is that enum; an FSM step
//! produces a `Vec<TransactionAction>` and never touches the table itself.

use std::time::Duration;

use crate::message::Message;
use crate::timer::TimerKind;

#[derive(Debug, Clone)]
pub enum TransactionAction {
    /// Send a message on the transaction's transport to its remote peer.
    SendToTransport(Message),
    /// Hand a freshly-arrived request up to the Transaction User.
    DeliverRequestToTu(crate::message::SipRequest),
    /// Hand a response up to the Transaction User.
    DeliverResponseToTu(crate::message::SipResponse),
    /// The transaction never received a final response in time.
    NotifyTimeout,
    /// The transport reported a send failure for this transaction.
    NotifyTransportFailed,
    /// Schedule a timer for this transaction. A zero duration means "do not
    /// schedule" (reliable-transport suppression).
    ScheduleTimer { kind: TimerKind, duration: Duration },
    /// Cancel a previously scheduled timer of this kind, if any.
    CancelTimer(TimerKind),
    /// Cancel every timer currently running for this transaction.
    CancelAllTimers,
    /// Move the transaction into the `Stale` absorber instead of destroying
    /// it outright.
    MoveToStale,
    /// Destroy the transaction; the dispatcher removes the table entry.
    Terminate,
}
