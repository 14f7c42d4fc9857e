//! Incremental frame boundary detection.
//!
//! The [`Framer`] is handed whatever bytes have arrived so far, starting at
//! the first byte of a frame.  It either reports "not enough data yet"
//! (a consumed count of `0`) or fills a [`Frame`] and reports how many bytes
//! the frame occupied, so the caller can advance its read cursor.
//!
//! # How the body length is found
//!
//! ```text
//! SEND\ncontent-length:5\n\nhel\0o\0
//!                        ^^ end of headers
//! ```
//!
//! - With a `content-length` header, the body is exactly that many bytes and
//!   may contain NUL.
//! - Without one, the body runs up to the next NUL byte.  A body that itself
//!   contains NUL is therefore cut short at its first NUL on this path; that
//!   is the protocol's behaviour and the framer reproduces it.

use tracing::trace;

use crate::protocol::frame::{Frame, FRAME_TERMINATOR};

/// Header name searched (case-insensitively) for a declared body length.
const CONTENT_LENGTH: &[u8] = b"content-length:";

/// Parser state for one frame.
///
/// The state only makes sense for one starting offset.  Call
/// [`Framer::reset`] before parsing a frame at a new offset.
#[derive(Debug, Default, Clone)]
pub struct Framer {
    /// Offset of the first `\n` of the `\n\n` that ends the headers.
    end_of_headers: Option<usize>,
    /// Declared body length, if a usable `content-length` header was found.
    content_length: Option<usize>,
    /// Whether the header block has already been searched for `content-length`.
    content_length_known: bool,
}

impl Framer {
    /// Creates a framer with no parse state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all parse state.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// Tries to extract one frame from the start of `bytes`.
    ///
    /// Returns the number of bytes the frame occupies (headers, body, and the
    /// terminating NUL), or `0` if more data is needed.  `frame` is only
    /// written when the return value is non-zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stomp_core::{Frame, Framer};
    ///
    /// let wire = b"MESSAGE\ndestination:/topic/a\n\nhi\0";
    /// let mut frame = Frame::default();
    ///
    /// assert_eq!(Framer::new().fill_frame(&wire[..10], &mut frame), 0);
    /// assert_eq!(Framer::new().fill_frame(wire, &mut frame), wire.len());
    /// assert_eq!(frame.body, b"hi");
    /// ```
    pub fn fill_frame(&mut self, bytes: &[u8], frame: &mut Frame) -> usize {
        let eoh = match self.end_of_headers {
            Some(eoh) => eoh,
            None => {
                let Some(eoh) = find_end_of_headers(bytes) else {
                    return 0;
                };
                self.end_of_headers = Some(eoh);
                eoh
            }
        };

        if !self.content_length_known {
            self.content_length = declared_length(&bytes[..=eoh]);
            self.content_length_known = true;
        }

        let body_start = eoh + 2;
        let body_len = match self.content_length {
            Some(len) if len > 0 => {
                // The declared body plus its terminating NUL must be present.
                match body_start.checked_add(len) {
                    Some(end) if end < bytes.len() => len,
                    _ => return 0,
                }
            }
            _ => match bytes[body_start..]
                .iter()
                .position(|&b| b == FRAME_TERMINATOR)
            {
                Some(len) => len,
                None => return 0,
            },
        };

        // A '\n' exists at or before `eoh`, so the verb line is always bounded.
        let eol = bytes[..=eoh]
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(eoh);

        frame.verb = String::from_utf8_lossy(&bytes[..eol]).into_owned();
        frame.headers = String::from_utf8_lossy(&bytes[eol + 1..eoh + 1]).into_owned();
        frame.body = bytes[body_start..body_start + body_len].to_vec();

        let consumed = body_start + body_len + 1;
        trace!(verb = %frame.verb, body_len, consumed, "frame boundary found");
        consumed
    }
}

/// Parses one frame from the start of `bytes` with a fresh [`Framer`].
///
/// Returns `None` if the frame is not complete yet.
pub fn parse_frame(bytes: &[u8]) -> Option<(Frame, usize)> {
    let mut frame = Frame::default();
    match Framer::new().fill_frame(bytes, &mut frame) {
        0 => None,
        consumed => Some((frame, consumed)),
    }
}

/// Finds the `\n\n` that ends the header block.
///
/// The search stops at the first NUL, the way a C string search over the
/// receive buffer would.
fn find_end_of_headers(bytes: &[u8]) -> Option<usize> {
    let limit = bytes
        .iter()
        .position(|&b| b == FRAME_TERMINATOR)
        .unwrap_or(bytes.len());
    bytes[..limit].windows(2).position(|w| w == b"\n\n")
}

/// Looks for a `content-length:` header anywhere in `header_block` and parses
/// its decimal value, skipping leading whitespace.
///
/// A value too large for `usize` is reported as `usize::MAX`, so the frame
/// can never complete.
fn declared_length(header_block: &[u8]) -> Option<usize> {
    let start = header_block
        .windows(CONTENT_LENGTH.len())
        .position(|w| w.eq_ignore_ascii_case(CONTENT_LENGTH))?
        + CONTENT_LENGTH.len();

    let value = &header_block[start..];
    let digits_start = value
        .iter()
        .position(|b| !b.is_ascii_whitespace() || *b == b'\n')
        .unwrap_or(value.len());
    let digits: Vec<u8> = value[digits_start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .copied()
        .collect();

    if digits.is_empty() {
        return None;
    }
    Some(
        std::str::from_utf8(&digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .unwrap_or(usize::MAX),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
