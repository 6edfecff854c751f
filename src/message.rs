//! Minimal SIP message model.
//!
//! The transaction layer only ever inspects a handful of fields on a SIP
//! message: the method, the status code, the topmost `Via` branch, the
//! `Call-ID`, the `CSeq`, and the `From`/`To` tags needed to build a
//! locally-generated ACK. Full message parsing/serialization and the
//! header/URI object model are external collaborators owned
//! by a SIP message crate this layer does not implement; this module is the
//! narrow contract this layer needs from that collaborator.

use std::fmt;

/// SIP request methods relevant to the transaction layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Info,
    Prack,
    Subscribe,
    Notify,
    Update,
    Refer,
    Message,
    Other(String),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Info => "INFO",
            Method::Prack => "PRACK",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Update => "UPDATE",
            Method::Refer => "REFER",
            Method::Message => "MESSAGE",
            Method::Other(m) => m.as_str(),
        };
        f.write_str(s)
    }
}

/// The topmost `Via` header of a message, the only one the transaction
/// layer cares about (branch matching + symmetric routing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    /// Branch parameter. RFC 3261-compliant branches begin with the magic
    /// cookie `z9hG4bK`; legacy branches are tolerated but do
    /// not get RFC 3261 matching guarantees.
    pub branch: String,
    pub sent_by: String,
    pub transport: String,
}

impl Via {
    pub fn new(branch: impl Into<String>, sent_by: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            sent_by: sent_by.into(),
            transport: transport.into(),
        }
    }

    /// Whether this branch carries the RFC 3261 magic cookie.
    pub fn is_rfc3261(&self) -> bool {
        self.branch.starts_with("z9hG4bK")
    }
}

/// A SIP request, trimmed to the fields the transaction layer inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipRequest {
    pub method: Method,
    pub request_uri: String,
    pub via: Via,
    pub call_id: String,
    pub from_uri: String,
    pub from_tag: Option<String>,
    pub to_uri: String,
    pub to_tag: Option<String>,
    pub cseq: u32,
    pub max_forwards: u32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SipRequest {
    pub fn new(method: Method, request_uri: impl Into<String>, via: Via, call_id: impl Into<String>, cseq: u32) -> Self {
        Self {
            method,
            request_uri: request_uri.into(),
            via,
            call_id: call_id.into(),
            from_uri: String::new(),
            from_tag: None,
            to_uri: String::new(),
            to_tag: None,
            cseq,
            max_forwards: 70,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// A SIP response, trimmed to the fields the transaction layer inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipResponse {
    pub status: u16,
    pub reason: String,
    pub via: Via,
    pub call_id: String,
    pub from_uri: String,
    pub from_tag: Option<String>,
    pub to_uri: String,
    pub to_tag: Option<String>,
    pub cseq: u32,
    pub cseq_method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SipResponse {
    pub fn new(status: u16, reason: impl Into<String>, via: Via, call_id: impl Into<String>, cseq: u32, cseq_method: Method) -> Self {
        Self {
            status,
            reason: reason.into(),
            via,
            call_id: call_id.into(),
            from_uri: String::new(),
            from_tag: None,
            to_uri: String::new(),
            to_tag: None,
            cseq,
            cseq_method,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// `100 <= status < 200`.
    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.status)
    }

    /// `status >= 200`. Deliberately distinct from `is_success`: a common
    /// bug conflates "success" with "final" and misclassifies 3xx-6xx
    /// responses as non-final.
    pub fn is_final(&self) -> bool {
        self.status >= 200
    }

    /// `200 <= status < 300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `status >= 300`.
    pub fn is_failure(&self) -> bool {
        self.status >= 300
    }
}

/// A parsed SIP message, as delivered by the external message parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(SipRequest),
    Response(SipResponse),
}

impl Message {
    pub fn via(&self) -> &Via {
        match self {
            Message::Request(r) => &r.via,
            Message::Response(r) => &r.via,
        }
    }

    pub fn call_id(&self) -> &str {
        match self {
            Message::Request(r) => &r.call_id,
            Message::Response(r) => &r.call_id,
        }
    }
}
