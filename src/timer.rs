//! Timer service.
//!
//! Schedules one-shot timers keyed by `(transaction-id, timer-kind)` and
//! delivers their expiry as an [`InboundMessage::TimerExpiry`] into the
//! dispatcher's input queue. Modeled after `dialog-core`'s
//! `transaction::timer::{TimerManager, TimerFactory}` pair, collapsed into
//! a single service since this crate's dispatcher (not a per-transaction
//! event loop) is the sole consumer of timer expiries.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::transaction::key::TransactionKey;
use crate::transaction::inbound::InboundMessage;

/// The named timers of RFC 3261 §17, plus the local `Trying` extension
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// INVITE client retransmit.
    A,
    /// INVITE client transaction timeout.
    B,
    /// Client INVITE wait in Completed (unreliable only).
    D,
    /// Non-INVITE client retransmit.
    E,
    /// Non-INVITE client transaction timeout.
    F,
    /// Non-INVITE client wait in Completed (unreliable only).
    K,
    /// INVITE server response retransmit.
    G,
    /// INVITE server wait for ACK.
    H,
    /// INVITE server wait in Confirmed (unreliable only).
    I,
    /// Non-INVITE server wait in Completed (unreliable only).
    J,
    /// Local extension: server non-INVITE/INVITE send-100 timer.
    Trying,
    /// Local extension: how long a destroyed-but-lingering transaction is
    /// kept in the `Stale` absorber before final removal.
    StaleExpiry,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerKind::A => "A",
            TimerKind::B => "B",
            TimerKind::D => "D",
            TimerKind::E => "E",
            TimerKind::F => "F",
            TimerKind::K => "K",
            TimerKind::G => "G",
            TimerKind::H => "H",
            TimerKind::I => "I",
            TimerKind::J => "J",
            TimerKind::Trying => "Trying",
            TimerKind::StaleExpiry => "StaleExpiry",
        };
        f.write_str(s)
    }
}

/// Standard timer durations. T1/T2/T4 are configurable; the
/// defaults match RFC 3261 §17.1.1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub t1: Duration,
    pub t2: Duration,
    pub t4: Duration,
    /// How long the server waits for the TU to produce a provisional
    /// response before auto-emitting 100 Trying (local extension).
    pub send_100_trying_delay: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            t4: Duration::from_secs(5),
            send_100_trying_delay: Duration::from_millis(200),
        }
    }
}

impl TimerSettings {
    /// Timer B: 64*T1.
    pub fn timer_b(&self) -> Duration {
        self.t1 * 64
    }

    /// Timer F: 64*T1.
    pub fn timer_f(&self) -> Duration {
        self.t1 * 64
    }

    /// Timer H: 64*T1.
    pub fn timer_h(&self) -> Duration {
        self.t1 * 64
    }

    /// Timer J: 64*T1 unreliable, 0 reliable.
    pub fn timer_j(&self, reliable: bool) -> Duration {
        if reliable { Duration::ZERO } else { self.t1 * 64 }
    }

    /// Timer D: >= 32s unreliable, 0 reliable.
    pub fn timer_d(&self, reliable: bool) -> Duration {
        if reliable { Duration::ZERO } else { Duration::from_secs(32) }
    }

    /// Timer K: T4 unreliable, 0 reliable.
    pub fn timer_k(&self, reliable: bool) -> Duration {
        if reliable { Duration::ZERO } else { self.t4 }
    }

    /// Timer I: T4 unreliable, 0 reliable.
    pub fn timer_i(&self, reliable: bool) -> Duration {
        if reliable { Duration::ZERO } else { self.t4 }
    }

    /// Next retransmit interval for timers A/E/G, doubled and capped at T2.
    /// Timer A is the exception: it doubles uncapped for the lifetime of
    /// the Calling state.
    pub fn next_retransmit(&self, current: Duration, cap_at_t2: bool) -> Duration {
        let doubled = current * 2;
        if cap_at_t2 {
            doubled.min(self.t2)
        } else {
            doubled
        }
    }
}

/// A scheduled, cancellable timer.
pub struct TimerHandle {
    join: JoinHandle<()>,
}

impl TimerHandle {
    /// Best-effort cancel: the underlying task is aborted, but a
    /// delivery already queued ahead of the abort may still arrive, and FSMs
    /// must tolerate that.
    pub fn cancel(&self) {
        self.join.abort();
    }
}

/// Schedules timer expiries onto the dispatcher's input queue.
#[derive(Clone)]
pub struct TimerService {
    input_tx: mpsc::Sender<InboundMessage>,
}

impl TimerService {
    pub fn new(input_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self { input_tx }
    }

    /// Schedule a one-shot timer. A `duration` of zero means "do not
    /// schedule" (reliable-transport suppression); callers check this
    /// before calling `schedule`, but as a defensive
    /// fallback a zero-duration timer here still fires once, immediately,
    /// rather than silently vanishing.
    pub fn schedule(&self, tx_id: TransactionKey, kind: TimerKind, duration: Duration) -> TimerHandle {
        let input_tx = self.input_tx.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            trace!(tx_id = %tx_id, timer = %kind, "timer fired");
            let _ = input_tx.send(InboundMessage::TimerExpiry { tx_id, kind }).await;
        });
        TimerHandle { join }
    }
}
