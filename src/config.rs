//! Configuration surface.

use crate::timer::TimerSettings;

/// The enumerated configuration options (T1/T2/T4, stray-response policy,
/// 100-Trying delay) plus the channel capacities needed to wire up the
/// `tokio::mpsc` plumbing — a resource knob, not a protocol concern, so it
/// lives here rather than in the FSM tables themselves.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    pub timers: TimerSettings,
    /// Drop responses matching no transaction (default `true`).
    pub discard_stray_responses: bool,
    /// Capacity of the dispatcher's input queue.
    pub input_queue_capacity: usize,
    /// Capacity of the channel delivering events to the Transaction User.
    pub tu_event_capacity: usize,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timers: TimerSettings::default(),
            discard_stray_responses: true,
            input_queue_capacity: 256,
            tu_event_capacity: 256,
        }
    }
}
