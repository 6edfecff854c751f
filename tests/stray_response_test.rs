//! Stray response policy.

mod common;

use serial_test::serial;

use std::net::SocketAddr;
use std::time::Duration;

use common::{fast_timers, response_to};
use sip_transaction_core::{Method, SipRequest, TransactionConfig, TransactionEvent, TransactionManager, Via};

fn remote_addr() -> SocketAddr {
    "127.0.0.1:5131".parse().unwrap()
}

fn unmatched_response() -> sip_transaction_core::SipResponse {
    let via = Via::new("z9hG4bK-nonexistent", "client.example.com:5130", "UDP");
    let phantom_request = SipRequest::new(Method::Invite, "sip:bob@example.com", via, "call-stray-1", 1);
    response_to(&phantom_request, 200, "OK")
}

#[tokio::test]
#[serial]
async fn stray_response_is_dropped_by_default() {
    let transport = common::MockTransport::new("127.0.0.1:5130", false);
    let config = TransactionConfig { timers: fast_timers(), ..Default::default() };
    assert!(config.discard_stray_responses, "default policy must discard stray responses");
    let (manager, mut tu_rx) = TransactionManager::new(transport.clone(), config);

    manager.receive_response(unmatched_response(), remote_addr()).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(100), tu_rx.recv()).await;
    assert!(outcome.is_err(), "a stray response must not reach the TU under the default policy");

    manager.shutdown().await;
}

#[tokio::test]
#[serial]
async fn stray_response_is_forwarded_when_policy_disabled() {
    let transport = common::MockTransport::new("127.0.0.1:5130", false);
    let config = TransactionConfig { timers: fast_timers(), discard_stray_responses: false, ..Default::default() };
    let (manager, mut tu_rx) = TransactionManager::new(transport.clone(), config);

    manager.receive_response(unmatched_response(), remote_addr()).await.unwrap();

    let event = tokio::time::timeout(Duration::from_millis(100), tu_rx.recv())
        .await
        .expect("should be forwarded when discard_stray_responses is false")
        .expect("channel open");
    match event {
        TransactionEvent::DeliverResponse { transaction_id, response } => {
            assert!(transaction_id.is_none(), "a stray response carries no transaction id");
            assert_eq!(response.status, 200);
        }
        other => panic!("expected DeliverResponse, got {other:?}"),
    }

    manager.shutdown().await;
}
