//! Convenience constructors for requests/responses and branch generation.
//!
//! Not part of the FSM core: a TU or test harness could build these
//! messages by hand, but every transaction crate in this lineage ships
//! helpers like these so it doesn't have to.

use uuid::Uuid;

use crate::message::{Method, SipRequest, SipResponse, Via};

/// Generate an RFC 3261-compliant branch parameter.
pub fn generate_branch() -> String {
    format!("z9hG4bK-{}", Uuid::new_v4().simple())
}

/// Build a response to `request` with the given status, copying the
/// headers a response must carry over (Via, Call-ID, From, To, CSeq), with
/// Content-Length left at zero for the caller to fill in if there's a body.
pub fn create_response(request: &SipRequest, status: u16, reason: impl Into<String>) -> SipResponse {
    let mut response = SipResponse::new(
        status,
        reason,
        request.via.clone(),
        request.call_id.clone(),
        request.cseq,
        request.method.clone(),
    );
    response.from_uri = request.from_uri.clone();
    response.from_tag = request.from_tag.clone();
    response.to_uri = request.to_uri.clone();
    response.to_tag = request.to_tag.clone();
    response
}

pub fn create_trying_response(request: &SipRequest) -> SipResponse {
    create_response(request, 100, "Trying")
}

pub fn create_ringing_response(request: &SipRequest) -> SipResponse {
    create_response(request, 180, "Ringing")
}

pub fn create_ok_response(request: &SipRequest) -> SipResponse {
    create_response(request, 200, "OK")
}

/// Build the ACK for a non-2xx final response to an INVITE. This ACK
/// belongs to the INVITE transaction itself, not a transaction of its own.
pub fn create_ack_from_invite(original_request: &SipRequest, response: &SipResponse) -> SipRequest {
    let via = Via::new(
        original_request.via.branch.clone(),
        original_request.via.sent_by.clone(),
        original_request.via.transport.clone(),
    );
    let mut ack = SipRequest::new(
        Method::Ack,
        original_request.request_uri.clone(),
        via,
        original_request.call_id.clone(),
        original_request.cseq,
    );
    ack.from_uri = original_request.from_uri.clone();
    ack.from_tag = original_request.from_tag.clone();
    ack.to_uri = response.to_uri.clone();
    ack.to_tag = response.to_tag.clone();
    ack.max_forwards = original_request.max_forwards;
    ack
}
