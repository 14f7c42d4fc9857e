//! Inbound read buffer management.
//!
//! The [`Reader`] owns one fixed-size byte arena.  Bytes arrive from the
//! socket into its free tail; the framer runs over the unconsumed part; when a
//! frame straddles the end of what has arrived, the unconsumed bytes are moved
//! back to the start of the arena and reading continues.
//!
//! ```text
//! 0            done           fill_point          capacity
//! |  consumed  |  left (unparsed) |      free        |S|
//!                                                    ^ sentinel NUL
//! ```
//!
//! Invariant after every operation: `fill_point == done + left`.
//!
//! The arena never grows.  A frame that does not fit in it is a fatal
//! [`StompError::FrameTooLarge`].

use std::io::Read;

use stomp_core::{Frame, Framer};
use tracing::trace;

use super::socket::fill;
use super::StompError;

/// Default receive buffer capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100_007;

/// Fixed-capacity receive buffer that turns a byte stream into frames.
#[derive(Debug)]
pub struct Reader {
    /// `capacity` data bytes plus one sentinel byte.
    buffer: Vec<u8>,
    capacity: usize,
    /// Next write offset.
    fill_point: usize,
    /// Bytes already handed out as frames.
    done: usize,
    /// Bytes filled but not yet parsed.
    left: usize,
    parser: Framer,
    /// `true` while buffered bytes may still hold a complete frame.
    parsing: bool,
}

impl Reader {
    /// Creates a reader with [`DEFAULT_BUFFER_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates a reader whose buffer holds `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity + 1],
            capacity,
            fill_point: 0,
            done: 0,
            left: 0,
            parser: Framer::new(),
            parsing: false,
        }
    }

    /// Buffer capacity in bytes (the sentinel excluded).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes received but not yet returned as part of a frame.
    pub fn buffered(&self) -> usize {
        self.left
    }

    /// Reads from `source` until one complete frame is buffered, and fills
    /// `frame` with it.
    ///
    /// Leading bare newlines (broker heartbeats) are skipped.  Bytes after the
    /// frame stay buffered for the next call.
    ///
    /// Returns `Ok(false)` when `source` reports end of stream.
    ///
    /// # Errors
    ///
    /// - [`StompError::FrameTooLarge`] if the buffer is completely full and
    ///   still holds no complete frame.
    /// - [`StompError::Socket`] for any read error other than interruption.
    pub fn read_frame<R: Read + ?Sized>(
        &mut self,
        frame: &mut Frame,
        source: &mut R,
    ) -> Result<bool, StompError> {
        loop {
            if !self.parsing {
                let free = self.capacity - self.fill_point;
                if free == 0 {
                    return Err(StompError::FrameTooLarge {
                        capacity: self.capacity,
                    });
                }

                let n = fill(source, &mut self.buffer[self.fill_point..self.capacity])?;
                if n == 0 {
                    return Ok(false);
                }

                self.left += n;
                self.fill_point += n;
                self.buffer[self.fill_point] = 0; // sentinel
                self.parsing = true;
                trace!(read = n, buffered = self.left, "filled receive buffer");
            }

            while self.left > 0 && self.buffer[self.done] == b'\n' {
                self.done += 1;
                self.left -= 1;
            }

            self.parser.reset();
            let used = if self.left > 0 {
                self.parser
                    .fill_frame(&self.buffer[self.done..self.fill_point], frame)
            } else {
                0
            };

            if used > 0 {
                self.done += used;
                self.left -= used;
                return Ok(true);
            }

            // Incomplete: compact if anything was consumed, then read more.
            self.parsing = false;
            if self.done > 0 {
                if self.left > 0 {
                    self.buffer.copy_within(self.done..self.fill_point, 0);
                }
                self.done = 0;
            }
            self.fill_point = self.left;
        }
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// A source that returns pre-arranged chunks, one per `read` call.
    struct Chunked {
        chunks: VecDeque<Vec<u8>>,
    }

    impl Chunked {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            }
        }
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(mut chunk) = self.chunks.pop_front() else {
                return Ok(0);
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            Ok(n)
        }
    }

    fn assert_invariant(reader: &Reader) {
        assert_eq!(reader.fill_point, reader.done + reader.left);
    }

    #[test]
    fn test_reads_single_frame() {
        // Arrange
        let mut reader = Reader::new();
        let mut source = Chunked::new(&[b"MESSAGE\ndestination:/queue/a\n\nhi\0"]);
        let mut frame = Frame::default();

        // Act
        let ok = reader.read_frame(&mut frame, &mut source).unwrap();

        // Assert
        assert!(ok);
        assert_eq!(frame.verb, "MESSAGE");
        assert_eq!(frame.body, b"hi");
        assert_invariant(&reader);
    }

    #[test]
    fn test_end_of_stream_returns_false() {
        let mut reader = Reader::new();
        let mut frame = Frame::default();
        let ok = reader
            .read_frame(&mut frame, &mut Chunked::new(&[]))
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_frame_split_across_reads() {
        let mut reader = Reader::new();
        let mut source = Chunked::new(&[b"MESS", b"AGE\n\nbo", b"dy\0"]);
        let mut frame = Frame::default();

        assert!(reader.read_frame(&mut frame, &mut source).unwrap());
        assert_eq!(frame.body, b"body");
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn test_two_frames_in_one_read_are_returned_one_at_a_time() {
        // Arrange
        let mut reader = Reader::new();
        let mut source = Chunked::new(&[b"RECEIPT\nreceipt-id:1\n\n\0MESSAGE\n\nsecond\0"]);
        let mut frame = Frame::default();

        // Act / Assert
        assert!(reader.read_frame(&mut frame, &mut source).unwrap());
        assert_eq!(frame.verb, "RECEIPT");
        assert_invariant(&reader);

        assert!(reader.read_frame(&mut frame, &mut source).unwrap());
        assert_eq!(frame.verb, "MESSAGE");
        assert_eq!(frame.body, b"second");
        assert_invariant(&reader);

        assert!(!reader.read_frame(&mut frame, &mut source).unwrap());
    }

    #[test]
    fn test_leading_heartbeat_newlines_are_skipped() {
        let mut reader = Reader::new();
        let mut source = Chunked::new(&[b"\n\n\n", b"\nCONNECTED\nversion:1.1\n\n\0"]);
        let mut frame = Frame::default();

        assert!(reader.read_frame(&mut frame, &mut source).unwrap());
        assert_eq!(frame.verb, "CONNECTED");
    }

    #[test]
    fn test_partial_frame_is_compacted_to_buffer_start() {
        // Arrange – a small buffer that only fits the second frame after
        // the first has been compacted away
        let first = b"MESSAGE\n\naaaaaaaaaa\0";
        let second = b"MESSAGE\n\nbbbbbbbbbb\0";
        let mut wire = first.to_vec();
        wire.extend_from_slice(&second[..5]);
        let mut reader = Reader::with_capacity(first.len() + 5);
        let mut source = Chunked::new(&[&wire, &second[5..]]);
        let mut frame = Frame::default();

        // Act
        assert!(reader.read_frame(&mut frame, &mut source).unwrap());
        assert_eq!(frame.body, b"aaaaaaaaaa");
        assert!(reader.read_frame(&mut frame, &mut source).unwrap());

        // Assert
        assert_eq!(frame.body, b"bbbbbbbbbb");
        assert_invariant(&reader);
    }

    #[test]
    fn test_declared_length_beyond_capacity_is_frame_too_large() {
        // Arrange – the header promises more than the buffer can hold
        let mut reader = Reader::with_capacity(64);
        let mut wire = b"MESSAGE\ncontent-length:500\n\n".to_vec();
        wire.extend(std::iter::repeat(b'x').take(501));
        let mut source = Chunked::new(&[&wire]);
        let mut frame = Frame::default();

        // Act
        let result = reader.read_frame(&mut frame, &mut source);

        // Assert
        assert!(matches!(result, Err(StompError::FrameTooLarge { capacity: 64 })));
    }

    #[test]
    fn test_content_length_near_usize_max_is_frame_too_large() {
        let lengths = [
            usize::MAX.to_string(),
            (usize::MAX - 20).to_string(),
            "99999999999999999999999".to_string(),
        ];

        for length in lengths {
            // Arrange – enough trailing bytes to fill the buffer
            let mut reader = Reader::with_capacity(64);
            let mut wire = format!("MESSAGE\ncontent-length:{length}\n\nabc\0").into_bytes();
            wire.resize(128, b'x');
            let mut frame = Frame::default();

            // Act
            let result = reader.read_frame(&mut frame, &mut Chunked::new(&[&wire]));

            // Assert
            let capacity = reader.capacity();
            assert!(
                matches!(result, Err(StompError::FrameTooLarge { capacity: c }) if c == capacity),
                "content-length {length}"
            );
        }
    }

    #[test]
    fn test_unterminated_frame_filling_buffer_is_frame_too_large() {
        let mut reader = Reader::with_capacity(32);
        let wire = vec![b'A'; 100];
        let mut frame = Frame::default();

        let result = reader.read_frame(&mut frame, &mut Chunked::new(&[&wire]));

        assert!(matches!(result, Err(StompError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_read_error_is_returned_as_socket_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::ConnectionReset.into())
            }
        }

        let mut reader = Reader::new();
        let mut frame = Frame::default();
        let result = reader.read_frame(&mut frame, &mut Broken);

        assert!(matches!(result, Err(StompError::Socket(_))));
    }

    #[test]
    fn test_frame_exactly_filling_buffer_is_accepted() {
        let wire = b"MESSAGE\n\nfits\0";
        let mut reader = Reader::with_capacity(wire.len());
        let mut frame = Frame::default();

        assert!(reader
            .read_frame(&mut frame, &mut Chunked::new(&[wire]))
            .unwrap());
        assert_eq!(frame.body, b"fits");
    }
}
