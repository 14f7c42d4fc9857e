//! Low-level socket helpers.
//!
//! # Interrupted system calls (for beginners)
//!
//! A blocking `read` or `write` can return early with
//! [`io::ErrorKind::Interrupted`] when a signal arrives while the thread is
//! waiting.  Nothing went wrong with the connection, so both helpers here
//! simply retry.  Every other error is handed back to the caller, which routes
//! it through the connection's [`ErrorPolicy`].

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;

use tracing::{debug, error};

use super::StompError;

/// Callback invoked with every socket error when the policy is
/// [`ErrorPolicy::Handler`].
pub type ErrorHook = Arc<dyn Fn(&StompError) + Send + Sync>;

/// What a connection does with a socket error.
#[derive(Clone, Default)]
pub enum ErrorPolicy {
    /// Return the error to the caller as `Err`.
    #[default]
    Propagate,
    /// Pass the error to the hook; the operation then reports a plain
    /// failure (`Ok(false)`, or "socket closed" on the read side).
    Handler(ErrorHook),
}

impl ErrorPolicy {
    /// Wraps a closure as a [`ErrorPolicy::Handler`].
    pub fn handler(hook: impl Fn(&StompError) + Send + Sync + 'static) -> Self {
        Self::Handler(Arc::new(hook))
    }

    /// Routes `err` according to the policy.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged under [`ErrorPolicy::Propagate`].
    pub fn route(&self, err: StompError) -> Result<(), StompError> {
        match self {
            Self::Propagate => Err(err),
            Self::Handler(hook) => {
                error!("socket error handled by hook: {err}");
                hook(&err);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propagate => f.write_str("Propagate"),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Reads once into `buf`, retrying on interruption.
///
/// Returns `Ok(0)` when the peer has closed the stream.
pub fn fill<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Writes all of `buf`, looping on partial writes and retrying on
/// interruption.
///
/// Returns `Ok(false)` if the sink stops accepting bytes (a write of zero).
pub fn drain<W: Write + ?Sized>(sink: &mut W, mut buf: &[u8]) -> io::Result<bool> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => return Ok(false),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Resolves `host` and connects to the first address that accepts.
///
/// # Errors
///
/// Returns [`StompError::Resolve`] if the name does not resolve to any
/// address, or [`StompError::Connect`] with the last connect error.
pub fn connect(host: &str, port: u16) -> Result<TcpStream, StompError> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|source| StompError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
    if addrs.is_empty() {
        return Err(StompError::Resolve {
            host: host.to_string(),
            source: last_err,
        });
    }

    for addr in &addrs {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                debug!("connected to {addr}");
                return Ok(stream);
            }
            Err(e) => {
                debug!("connect to {addr} failed: {e}");
                last_err = e;
            }
        }
    }

    Err(StompError::Connect {
        addr: format!("{host}:{port}"),
        source: last_err,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
