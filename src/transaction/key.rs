//! Transaction identity.

use std::fmt;

use crate::message::{Message, Method};

/// Which of the four RFC 3261 machines (or the Stale absorber) a
/// transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    InviteClient,
    NonInviteClient,
    InviteServer,
    NonInviteServer,
}

impl TransactionKind {
    pub fn is_client(self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::NonInviteClient)
    }

    pub fn is_invite(self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::InviteServer)
    }
}

/// Opaque, comparable, hashable transaction identity.
///
/// For any non-ACK request the id is `branch ++ method`; an ACK to a
/// non-2xx final response matches the id of the original INVITE
/// (`branch ++ "INVITE"`); an ACK to a 2xx is not a transaction message at
/// all and never produces a `TransactionKey`. A response's id is
/// `branch ++ CSeq.method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    branch: String,
    method: Method,
}

impl TransactionKey {
    pub fn new(branch: impl Into<String>, method: Method) -> Self {
        Self {
            branch: branch.into(),
            method,
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.branch, self.method)
    }
}

/// Derive the transaction id of an inbound request.
///
/// Returns `None` when the message cannot be assigned an id: a missing
/// branch, a response with no CSeq, or an ACK acknowledging a 2xx response
/// (which is not a transaction-layer message — the TU owns it).
///
/// An ACK is always keyed to the INVITE it would match if that INVITE's
/// final response was a failure; the dispatcher resolves the 2xx-ACK case
/// separately by noticing the lookup misses and forwarding to the TU
/// directly rather than spinning up a transaction for it.
pub fn transaction_key_for_request(request: &crate::message::SipRequest) -> Option<TransactionKey> {
    if request.via.branch.is_empty() {
        return None;
    }
    match request.method {
        Method::Ack => Some(TransactionKey::new(request.via.branch.clone(), Method::Invite)),
        ref m => Some(TransactionKey::new(request.via.branch.clone(), m.clone())),
    }
}

pub fn transaction_key_for_response(response: &crate::message::SipResponse) -> Option<TransactionKey> {
    if response.via.branch.is_empty() {
        return None;
    }
    Some(TransactionKey::new(response.via.branch.clone(), response.cseq_method.clone()))
}

/// Derive a transaction id from any inbound message, request or response.
pub fn transaction_key_from_message(message: &Message) -> Option<TransactionKey> {
    match message {
        Message::Request(r) => transaction_key_for_request(r),
        Message::Response(r) => transaction_key_for_response(r),
    }
}

/// Classify which kind of transaction a fresh request should create.
pub fn determine_transaction_kind(method: &Method, is_server: bool) -> TransactionKind {
    match (method, is_server) {
        (Method::Invite, true) => TransactionKind::InviteServer,
        (Method::Invite, false) => TransactionKind::InviteClient,
        (_, true) => TransactionKind::NonInviteServer,
        (_, false) => TransactionKind::NonInviteClient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{SipRequest, SipResponse, Via};

    fn via(branch: &str) -> Via {
        Via::new(branch, "client.example.com", "UDP")
    }

    #[test]
    fn non_ack_request_key_is_branch_plus_method() {
        let req = SipRequest::new(Method::Options, "sip:bob@example.com", via("z9hG4bK-1"), "call-1", 1);
        let key = transaction_key_for_request(&req).unwrap();
        assert_eq!(key.to_string(), "z9hG4bK-1:OPTIONS");
    }

    #[test]
    fn ack_key_matches_original_invite() {
        let ack = SipRequest::new(Method::Ack, "sip:bob@example.com", via("z9hG4bK-2"), "call-2", 1);
        let key = transaction_key_for_request(&ack).unwrap();
        assert_eq!(key.method(), &Method::Invite);
        assert_eq!(key.to_string(), "z9hG4bK-2:INVITE");
    }

    #[test]
    fn response_key_uses_cseq_method() {
        let resp = SipResponse::new(200, "OK", via("z9hG4bK-3"), "call-3", 1, Method::Register);
        let key = transaction_key_for_response(&resp).unwrap();
        assert_eq!(key.to_string(), "z9hG4bK-3:REGISTER");
    }

    #[test]
    fn missing_branch_has_no_key() {
        let req = SipRequest::new(Method::Invite, "sip:bob@example.com", via(""), "call-4", 1);
        assert!(transaction_key_for_request(&req).is_none());
    }
}
