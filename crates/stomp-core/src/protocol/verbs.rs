//! Builders for the frames a client sends.
//!
//! Each function returns a complete [`Frame`]; callers turn it into wire bytes
//! with [`Frame::to_bytes`].

use crate::domain::endpoint::EndPoint;
use crate::protocol::frame::{Frame, FRAME_TERMINATOR};

/// Protocol versions offered during the handshake.
pub const ACCEPT_VERSION: &str = "1.0,1.1";

/// Client-side verbs.
pub const STOMP: &str = "STOMP";
pub const SEND: &str = "SEND";
pub const SUBSCRIBE: &str = "SUBSCRIBE";
pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
pub const DISCONNECT: &str = "DISCONNECT";

/// Broker-side verbs.
pub const CONNECTED: &str = "CONNECTED";
pub const MESSAGE: &str = "MESSAGE";
pub const RECEIPT: &str = "RECEIPT";
pub const ERROR: &str = "ERROR";

/// The version-negotiation frame that opens a session.
pub fn stomp(host: &str) -> Frame {
    Frame::new(STOMP)
        .with_header("accept-version", ACCEPT_VERSION)
        .with_header("host", host)
}

/// A SEND frame carrying `data` to `destination`.
///
/// A `content-length` header is added only when `data` contains a NUL byte;
/// without it the receiving side would end the body at that NUL.
pub fn send(data: &[u8], destination: &EndPoint) -> Frame {
    let frame = Frame::new(SEND).with_header("destination", destination.path());
    let frame = if data.contains(&FRAME_TERMINATOR) {
        frame.with_header("content-length", data.len())
    } else {
        frame
    };
    frame.with_body(data.to_vec())
}

/// A SUBSCRIBE frame registering subscription `id` on `destination`.
pub fn subscribe(destination: &EndPoint, id: u32) -> Frame {
    Frame::new(SUBSCRIBE)
        .with_header("destination", destination.path())
        .with_header("id", id)
}

/// An UNSUBSCRIBE frame cancelling subscription `id`.
pub fn unsubscribe(id: u32) -> Frame {
    Frame::new(UNSUBSCRIBE).with_header("id", id)
}

/// The DISCONNECT frame.
pub fn disconnect() -> Frame {
    Frame::new(DISCONNECT)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
