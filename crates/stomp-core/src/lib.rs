//! # stomp-core
//!
//! Shared library for the STOMP client containing the frame model, the
//! incremental frame boundary detector, destination endpoints, and the FIFO
//! write lock.
//!
//! This crate has no dependency on sockets.  The `stomp-client` crate drives
//! it from a TCP connection.
//!
//! # Architecture overview (for beginners)
//!
//! STOMP is a text protocol for talking to message brokers.  Every exchange is
//! a *frame*: a verb line, some `name:value` header lines, a blank line, a
//! body, and a NUL byte.
//!
//! - **`protocol`** – How frames look on the wire.  [`Frame`] holds one
//!   frame; [`Framer`] finds frame boundaries in bytes that may have arrived
//!   in several partial reads; [`protocol::verbs`] builds the frames a client
//!   sends.
//!
//! - **`domain`** – [`EndPoint`], a named queue or topic.
//!
//! - **`sync`** – [`FairLock`], a FIFO reentrant lock used to keep frames
//!   written by concurrent publishers from interleaving on one socket.

pub mod domain;
pub mod protocol;
pub mod sync;

// Re-export the most-used types at the crate root so callers can write
// `stomp_core::Frame` instead of `stomp_core::protocol::frame::Frame`.
pub use domain::endpoint::EndPoint;
pub use protocol::frame::Frame;
pub use protocol::framer::{parse_frame, Framer};
pub use sync::fair_lock::{FairGuard, FairLock, FairLockError};
