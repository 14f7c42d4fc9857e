//! The STOMP frame model.
//!
//! Wire format:
//! ```text
//! VERB\n
//! header-name:header-value\n
//! ...
//! \n
//! BODY\0
//! ```
//!
//! # Why keep the headers raw? (for beginners)
//!
//! The client only ever needs one or two header values out of an inbound
//! frame (`destination`, sometimes `content-length`).  Splitting every header
//! line into a map for every frame would cost an allocation per header for
//! nothing, so [`Frame`] stores the header block exactly as it arrived and
//! [`Frame::header`] scans it on demand.

use std::fmt;

/// The byte that terminates every STOMP frame.
pub const FRAME_TERMINATOR: u8 = 0x00;

/// One protocol unit: verb, raw header block, and body.
///
/// `headers` holds every header line including the newline that ends the last
/// line, but not the blank line that separates headers from the body.  A frame
/// without headers has an empty `headers` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// The command line, e.g. `"SEND"`, `"MESSAGE"`, `"CONNECTED"`.
    pub verb: String,
    /// Raw header block, one `name:value\n` line per header.
    pub headers: String,
    /// Body bytes.  May contain NUL only when a `content-length` was declared.
    pub body: Vec<u8>,
}

impl Frame {
    /// Creates a frame with the given verb and no headers or body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stomp_core::Frame;
    ///
    /// let frame = Frame::new("SEND")
    ///     .with_header("destination", "/queue/orders")
    ///     .with_body(b"42".to_vec());
    /// assert_eq!(frame.header("destination"), Some("/queue/orders"));
    /// ```
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            headers: String::new(),
            body: Vec::new(),
        }
    }

    /// Appends a `name:value` header line.
    pub fn with_header(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.headers.push_str(name);
        self.headers.push(':');
        self.headers.push_str(&value.to_string());
        self.headers.push('\n');
        self
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Returns the value of the first header called `name`.
    ///
    /// Header names are matched exactly, as STOMP 1.1 requires.  The value is
    /// everything after the first `:` on the line.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key == name).then_some(value)
        })
    }

    /// Returns `true` if the verb line contains `verb`.
    ///
    /// Matching is by containment rather than equality so that a verb line
    /// carrying a stray `\r` from a CRLF-speaking broker still matches.
    pub fn is(&self, verb: &str) -> bool {
        self.verb.contains(verb)
    }

    /// Clears every field so the frame can be reused for the next parse.
    pub fn reset(&mut self) {
        self.verb.clear();
        self.headers.clear();
        self.body.clear();
    }

    /// Serializes the frame into wire bytes, including the terminating NUL.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(self.verb.len() + self.headers.len() + self.body.len() + 3);
        buf.extend_from_slice(self.verb.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(self.headers.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(&self.body);
        buf.push(FRAME_TERMINATOR);
        buf
    }
}

impl fmt::Display for Frame {
    /// Renders the frame for log output: verb, headers, then the body as
    /// lossy UTF-8.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.verb)?;
        write!(f, "{}", self.headers)?;
        write!(f, "{}", String::from_utf8_lossy(&self.body))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
