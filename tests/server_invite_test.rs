//! Server INVITE transaction scenario.

mod common;

use serial_test::serial;

use std::net::SocketAddr;
use std::time::Duration;

use common::{fast_timers, invite_request};
use sip_transaction_core::{Method, TransactionConfig, TransactionEvent, TransactionManager};

fn addrs() -> (SocketAddr, SocketAddr) {
    ("127.0.0.1:5090".parse().unwrap(), "127.0.0.1:5100".parse().unwrap())
}

#[tokio::test]
#[serial]
async fn happy_path_auto_trying_then_tu_driven_finals_terminate_promptly() {
    let (_server_addr, remote_addr) = addrs();
    let transport = common::MockTransport::new("127.0.0.1:5090", false);
    let config = TransactionConfig { timers: fast_timers(), ..Default::default() };
    let (manager, mut tu_rx) = TransactionManager::new(transport.clone(), config.clone());

    let request = invite_request("z9hG4bK-srv-invite");
    manager.receive_request(request.clone(), remote_addr).await.unwrap();

    let event = tokio::time::timeout(Duration::from_millis(200), tu_rx.recv()).await.unwrap().unwrap();
    let tx_id = match event {
        TransactionEvent::DeliverRequest { transaction_id, request: delivered } => {
            assert_eq!(delivered.method, Method::Invite);
            transaction_id
        }
        other => panic!("expected DeliverRequest, got {other:?}"),
    };

    // The TU stays silent past the 100-Trying window: the transaction emits
    // a 100 Trying on its behalf.
    let trying_count = transport.wait_for_count(1, Duration::from_millis(150)).await;
    assert_eq!(trying_count, 1);
    assert_eq!(transport.count_status(100).await, 1);

    // TU sends 180 Ringing.
    let ringing = common::response_to(&request, 180, "Ringing");
    manager.send_response(ringing, remote_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(transport.count_status(180).await, 1);

    // TU sends 200 OK: the transaction terminates immediately, without
    // waiting on any ACK (2xx retransmission is the TU/dialog layer's job).
    let ok = common::response_to(&request, 200, "OK");
    manager.send_response(ok, remote_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(transport.count_status(200).await, 1);

    // A subsequent retransmitted INVITE arrives while the record is still
    // lingering in Stale (within one T4 of termination): it must be
    // silently absorbed, not redelivered to the TU and not re-sent on the
    // wire, since the 2xx path has no Completed state to retransmit from.
    manager.receive_request(request, remote_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let redeliver = tokio::time::timeout(Duration::from_millis(60), tu_rx.recv()).await;
    assert!(redeliver.is_err(), "a late INVITE retransmit must be absorbed by the Stale state, not redelivered");
    assert_eq!(transport.count_status(200).await, 1, "the Stale absorber must not re-send the 200 either");

    let _ = tx_id;
    manager.shutdown().await;
}

#[tokio::test]
#[serial]
async fn failure_final_retransmits_on_invite_retransmit_until_ack() {
    let (_server_addr, remote_addr) = addrs();
    let transport = common::MockTransport::new("127.0.0.1:5090", false);
    let config = TransactionConfig { timers: fast_timers(), ..Default::default() };
    let (manager, mut tu_rx) = TransactionManager::new(transport.clone(), config.clone());

    let request = invite_request("z9hG4bK-srv-486");
    manager.receive_request(request.clone(), remote_addr).await.unwrap();
    let _ = tokio::time::timeout(Duration::from_millis(100), tu_rx.recv()).await.unwrap().unwrap();

    let busy = common::response_to(&request, 486, "Busy Here");
    manager.send_response(busy, remote_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(transport.count_status(486).await, 1);

    // Client retransmits the INVITE while Completed: resend the buffered 486.
    manager.receive_request(request.clone(), remote_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(transport.count_status(486).await, 2);

    // Without an ACK, timer G keeps resending; eventually timer H would time
    // out, but an ACK here should move straight to Confirmed and stop it.
    let mut ack = request.clone();
    ack.method = Method::Ack;
    manager.receive_request(ack, remote_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    let after_ack = transport.count_status(486).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(transport.count_status(486).await, after_ack, "ACK must stop further 486 retransmits");

    manager.shutdown().await;
}
