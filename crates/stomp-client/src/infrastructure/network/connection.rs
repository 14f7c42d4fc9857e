//! One TCP connection to a STOMP broker.
//!
//! # Threading model (for beginners)
//!
//! A [`Connection`] is shared between threads behind an `Arc`:
//!
//! - Any number of *writer* threads call [`Connection::send`],
//!   [`Connection::subscribe`] and friends.  Each call writes one complete
//!   frame while holding a [`FairLock`], so frames from different threads
//!   never interleave on the wire and are written in the order the callers
//!   arrived.
//! - Exactly one *reader* thread (the session's dispatcher) calls
//!   [`Connection::receive`].  The receive buffer sits behind its own mutex,
//!   so reading never waits on writers and vice versa.
//!
//! `&TcpStream` implements both `Read` and `Write`, which is what lets the two
//! sides share one socket without splitting it.

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use stomp_core::{protocol::verbs, EndPoint, FairLock, Frame};
use tracing::{debug, info, warn};

use super::reader::Reader;
use super::socket::{self, drain, ErrorPolicy};
use super::StompError;
use crate::domain::config::BrokerConfig;

/// A message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Raw payload.
    pub body: Vec<u8>,
    /// Where the message was published.
    pub endpoint: EndPoint,
}

/// A STOMP connection: handshake, outbound verbs, and inbound messages.
pub struct Connection {
    stream: TcpStream,
    host: String,
    writers: FairLock,
    reader: Mutex<Reader>,
    stomped: AtomicBool,
    policy: ErrorPolicy,
}

impl Connection {
    /// Connects to the broker described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::Resolve`] or [`StompError::Connect`] if no TCP
    /// connection could be established.
    pub fn connect(config: &BrokerConfig) -> Result<Self, StompError> {
        let stream = socket::connect(&config.host, config.port)?;
        info!(host = %config.host, port = config.port, "connected to broker");
        Ok(Self::from_stream(
            stream,
            config.host.clone(),
            config.buffer_capacity,
        ))
    }

    /// Wraps an already connected stream.
    ///
    /// `host` is the value sent in the handshake's `host` header.
    pub fn from_stream(stream: TcpStream, host: impl Into<String>, buffer_capacity: usize) -> Self {
        Self {
            stream,
            host: host.into(),
            writers: FairLock::new(),
            reader: Mutex::new(Reader::with_capacity(buffer_capacity)),
            stomped: AtomicBool::new(false),
            policy: ErrorPolicy::default(),
        }
    }

    /// Replaces the socket error policy.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The host name announced during the handshake.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns `true` once a handshake has been attempted.
    pub fn is_stomped(&self) -> bool {
        self.stomped.load(Ordering::SeqCst)
    }

    /// Negotiates the protocol version with the broker.
    ///
    /// Only the first call on a connection does anything; later calls return
    /// `Ok(false)`.  A reply other than `CONNECTED`, or the broker closing the
    /// socket, is also `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Socket errors under [`ErrorPolicy::Propagate`], and
    /// [`StompError::FrameTooLarge`].
    pub fn handshake(&self) -> Result<bool, StompError> {
        if self.stomped.swap(true, Ordering::SeqCst) {
            warn!("handshake already attempted on this connection");
            return Ok(false);
        }
        if !self.transmit(&verbs::stomp(&self.host))? {
            warn!("handshake failed: could not transmit STOMP frame");
            return Ok(false);
        }

        let mut frame = Frame::default();
        if !self.next_frame(&mut frame)? {
            warn!("handshake failed: broker closed the socket");
            return Ok(false);
        }
        if frame.is(verbs::CONNECTED) {
            info!(host = %self.host, "STOMP handshake complete");
            Ok(true)
        } else {
            warn!("handshake rejected by broker:\n{frame}");
            Ok(false)
        }
    }

    /// Publishes `data` to `destination`.
    pub fn send(&self, data: &[u8], destination: &EndPoint) -> Result<bool, StompError> {
        self.transmit(&verbs::send(data, destination))
    }

    /// Registers subscription `id` on `destination` with the broker.
    pub fn subscribe(&self, destination: &EndPoint, id: u32) -> Result<bool, StompError> {
        self.transmit(&verbs::subscribe(destination, id))
    }

    /// Cancels subscription `id`.
    pub fn unsubscribe(&self, id: u32) -> Result<bool, StompError> {
        self.transmit(&verbs::unsubscribe(id))
    }

    /// Tells the broker this client is leaving.
    pub fn disconnect(&self) -> Result<bool, StompError> {
        self.transmit(&verbs::disconnect())
    }

    /// Blocks until the next MESSAGE frame arrives.
    ///
    /// RECEIPT and ERROR frames are logged and skipped, as are MESSAGE frames
    /// whose destination is neither a queue nor a topic.  Returns `Ok(None)`
    /// once the socket is closed.
    ///
    /// # Errors
    ///
    /// Socket errors under [`ErrorPolicy::Propagate`], and
    /// [`StompError::FrameTooLarge`].
    pub fn receive(&self) -> Result<Option<Message>, StompError> {
        let mut frame = Frame::default();
        loop {
            frame.reset();
            if !self.next_frame(&mut frame)? {
                debug!("receive: socket closed");
                return Ok(None);
            }

            if frame.is(verbs::MESSAGE) {
                match unmarshal(&frame) {
                    Some(message) => {
                        debug!(endpoint = %message.endpoint, len = message.body.len(), "message received");
                        return Ok(Some(message));
                    }
                    None => warn!(
                        destination = frame.header("destination").unwrap_or_default(),
                        "skipping MESSAGE with unrecognised destination"
                    ),
                }
            } else if frame.is(verbs::RECEIPT) || frame.is(verbs::ERROR) {
                warn!("broker sent {}:\n{frame}", frame.verb);
            } else {
                debug!(verb = %frame.verb, "ignoring unexpected frame");
            }
        }
    }

    /// Writes one frame under the writer lock.
    fn transmit(&self, frame: &Frame) -> Result<bool, StompError> {
        let bytes = frame.to_bytes();
        let _guard = self.writers.lock();

        match drain(&mut &self.stream, &bytes) {
            Ok(true) => {
                debug!(verb = %frame.verb, len = bytes.len(), "frame sent");
                Ok(true)
            }
            Ok(false) => {
                warn!(verb = %frame.verb, "socket stopped accepting bytes");
                Ok(false)
            }
            Err(e) => {
                self.policy.route(StompError::Socket(e))?;
                Ok(false)
            }
        }
    }

    /// Reads one frame of any verb.  `Ok(false)` means the socket is closed.
    fn next_frame(&self, frame: &mut Frame) -> Result<bool, StompError> {
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);

        match reader.read_frame(frame, &mut &self.stream) {
            Ok(got) => Ok(got),
            Err(e @ StompError::FrameTooLarge { .. }) => Err(e),
            Err(e) => {
                self.policy.route(e)?;
                Ok(false)
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The peer may already be gone.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Extracts the payload and destination of a MESSAGE frame.
fn unmarshal(frame: &Frame) -> Option<Message> {
    let endpoint = EndPoint::from_path(frame.header("destination")?)?;
    Some(Message {
        body: frame.body.clone(),
        endpoint,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
