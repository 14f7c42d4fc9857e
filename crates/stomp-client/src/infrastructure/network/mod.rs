//! Network infrastructure for the STOMP client.
//!
//! Architecture:
//! - `socket` holds the retrying read/write helpers, address resolution, and
//!   the pluggable error policy.
//! - `reader` owns the fixed receive buffer and drives the framer across
//!   partial reads.
//! - `connection` owns the TCP stream; outbound frames are serialized through
//!   a [`stomp_core::FairLock`], inbound frames are unmarshalled into
//!   [`Message`]s.

pub mod connection;
pub mod reader;
pub mod socket;

use thiserror::Error;

pub use connection::{Connection, Message};
pub use reader::{Reader, DEFAULT_BUFFER_CAPACITY};
pub use socket::{ErrorHook, ErrorPolicy};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum StompError {
    /// The broker host name could not be resolved.
    #[error("failed to resolve broker host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    /// No resolved address accepted the TCP connection.
    #[error("failed to connect to broker at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
    /// The receive buffer filled up without yielding a complete frame.
    #[error("frame too large: receive buffer of {capacity} bytes is full")]
    FrameTooLarge { capacity: usize },
    /// The OS refused to start the dispatch thread.
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[source] std::io::Error),
}
