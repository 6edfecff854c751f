//! Shared fixtures for the integration tests under `tests/`: an in-memory
//! `MockTransport` plus message-builder helpers, trimmed to this crate's
//! own minimal message model.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use sip_transaction_core::message::{Message, Method, SipRequest, SipResponse, Via};
use sip_transaction_core::transport::{Transport, TransportError, TransportResult};
use sip_transaction_core::TimerSettings;

/// Timer settings scaled down so retransmission/timeout tests finish in
/// well under a second instead of RFC 3261's real-world 500ms/32s/64*T1.
/// Ratios between T1/T2/T4 and the derived timers (A/B/D/E/F/K/G/H/I/J) are
/// preserved; only the absolute scale shrinks.
pub fn fast_timers() -> TimerSettings {
    TimerSettings {
        t1: Duration::from_millis(20),
        t2: Duration::from_millis(80),
        t4: Duration::from_millis(100),
        send_100_trying_delay: Duration::from_millis(15),
    }
}

/// Records every message handed to `send`, in order, and lets tests wait
/// for or drain them. Also able to simulate send failures on demand.
#[derive(Debug)]
pub struct MockTransport {
    local_addr: SocketAddr,
    reliable: bool,
    sent: Mutex<VecDeque<(Message, SocketAddr)>>,
    notify: Notify,
    should_fail: AtomicBool,
}

impl MockTransport {
    pub fn new(local_addr: &str, reliable: bool) -> Arc<Self> {
        Arc::new(Self {
            local_addr: local_addr.parse().unwrap(),
            reliable,
            sent: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            should_fail: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn drain(&self) -> Vec<(Message, SocketAddr)> {
        self.sent.lock().await.drain(..).collect()
    }

    pub async fn count_method(&self, method: Method) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(m, _)| matches!(m, Message::Request(r) if r.method == method))
            .count()
    }

    pub async fn count_status(&self, status: u16) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(m, _)| matches!(m, Message::Response(r) if r.status == status))
            .count()
    }

    /// Wait until at least `n` messages have been sent, or the timeout
    /// elapses (returns the count observed either way).
    pub async fn wait_for_count(&self, n: usize, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let current = self.count().await;
            if current >= n || tokio::time::Instant::now() >= deadline {
                return current;
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let _ = tokio::time::timeout(remaining.min(Duration::from_millis(5)), self.notify.notified()).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, message: Message, destination: SocketAddr) -> TransportResult<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TransportError("mock transport failure".into()));
        }
        self.sent.lock().await.push_back((message, destination));
        self.notify.notify_waiters();
        Ok(())
    }

    fn is_reliable(&self) -> bool {
        self.reliable
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn via(branch: &str, sent_by: &str) -> Via {
    Via::new(branch, sent_by, "UDP")
}

pub fn options_request(branch: &str) -> SipRequest {
    let mut req = SipRequest::new(Method::Options, "sip:bob@example.com", via(branch, "client.example.com:5070"), "call-options-1", 1);
    req.from_uri = "sip:alice@example.com".into();
    req.from_tag = Some("alice-tag".into());
    req.to_uri = "sip:bob@example.com".into();
    req
}

pub fn invite_request(branch: &str) -> SipRequest {
    let mut req = SipRequest::new(Method::Invite, "sip:bob@example.com", via(branch, "client.example.com:5070"), "call-invite-1", 1);
    req.from_uri = "sip:alice@example.com".into();
    req.from_tag = Some("alice-tag".into());
    req.to_uri = "sip:bob@example.com".into();
    req
}

pub fn register_request(branch: &str) -> SipRequest {
    let mut req = SipRequest::new(Method::Register, "sip:registrar.example.com", via(branch, "client.example.com:5070"), "call-register-1", 1);
    req.from_uri = "sip:alice@example.com".into();
    req.from_tag = Some("alice-tag".into());
    req.to_uri = "sip:alice@example.com".into();
    req
}

pub fn response_to(request: &SipRequest, status: u16, reason: &str) -> SipResponse {
    let mut resp = SipResponse::new(status, reason, request.via.clone(), request.call_id.clone(), request.cseq, request.method.clone());
    resp.from_uri = request.from_uri.clone();
    resp.from_tag = request.from_tag.clone();
    resp.to_uri = request.to_uri.clone();
    resp.to_tag = Some("bob-tag".into());
    resp
}
