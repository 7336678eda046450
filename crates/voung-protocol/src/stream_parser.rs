//! Stream reassembler for Voung protocol frames.
//!
//! TCP gives no message boundaries: a single read may carry part of a
//! frame, several frames, or line noise. [`StreamReassembler`] buffers the
//! bytes received so far and turns them into a lazy sequence of
//! [`FrameEvent`]s, one step per [`next_event`] call.
//!
//! # Resynchronization
//!
//! Frames are located by the `WKLY` marker and sized by the length byte
//! that follows it:
//!
//! - bytes before the next marker are dropped and reported as
//!   [`FrameEvent::Discarded`]; when no marker is present at all only the
//!   last 3 bytes are kept, since they may be the start of a split marker;
//! - a length byte below 8 skips the marker and reports
//!   [`MalformedFrame::InvalidLength`];
//! - a frame whose checksum does not match is consumed whole and reported
//!   as [`MalformedFrame::ChecksumMismatch`].
//!
//! # Usage
//!
//! ```
//! use voung_protocol::{StreamReassembler, FrameEvent};
//!
//! let bytes = voung_protocol::frame::encode(1, 0x80, &[0x00]).unwrap();
//! let mut reassembler = StreamReassembler::new();
//!
//! reassembler.feed(&bytes[..5]);
//! assert!(reassembler.next_event().is_none());
//!
//! reassembler.feed(&bytes[5..]);
//! match reassembler.next_event() {
//!     Some(FrameEvent::Frame(frame)) => assert_eq!(frame.command, 0x80),
//!     other => panic!("unexpected event: {:?}", other),
//! }
//! ```
//!
//! [`next_event`]: StreamReassembler::next_event

use bytes::{Buf, BytesMut};
use voung_core::constants::{FRAME_MARKER, FRAME_OVERHEAD, LENGTH_OFFSET, MARKER_LEN};

use crate::frame::{self, Frame, MalformedFrame};

/// Initial buffer capacity: one maximum-size frame plus slack.
const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Bytes kept when no marker is found; a marker split across reads can
/// leave at most this many of its bytes at the tail.
const MARKER_TAIL: usize = MARKER_LEN - 1;

/// One step of reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A well-formed frame.
    Frame(Frame),

    /// A marker was found but the bytes behind it are not a valid frame.
    Malformed(MalformedFrame),

    /// `len` bytes were dropped while searching for the next marker.
    Discarded { len: usize },
}

/// Per-connection byte accumulator producing [`FrameEvent`]s.
///
/// [`feed`](StreamReassembler::feed) only appends; all parsing happens in
/// [`next_event`](StreamReassembler::next_event). Draining can stop at any
/// point and resume after more bytes arrive.
#[derive(Debug)]
pub struct StreamReassembler {
    buffer: BytesMut,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append bytes received from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Perform one reassembly step.
    ///
    /// Returns `None` when more bytes are needed before anything can be
    /// decided.
    pub fn next_event(&mut self) -> Option<FrameEvent> {
        if self.buffer.len() < FRAME_OVERHEAD {
            return None;
        }

        if !self.buffer.starts_with(FRAME_MARKER) {
            return Some(self.resync());
        }

        let declared = self.buffer[LENGTH_OFFSET];
        let len = declared as usize;
        if len < FRAME_OVERHEAD {
            self.buffer.advance(MARKER_LEN);
            return Some(FrameEvent::Malformed(MalformedFrame::InvalidLength {
                declared,
            }));
        }

        if len > self.buffer.len() {
            return None;
        }

        let event = match frame::decode(&self.buffer[..len]) {
            Ok((frame, _)) => FrameEvent::Frame(frame),
            Err(err) => FrameEvent::Malformed(err),
        };
        self.buffer.advance(len);

        Some(event)
    }

    /// Drain every event that can be produced from the bytes buffered so far.
    pub fn events(&mut self) -> Events<'_> {
        Events { reassembler: self }
    }

    /// Number of bytes buffered but not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn resync(&mut self) -> FrameEvent {
        let dropped = match find_marker(&self.buffer[1..]) {
            Some(pos) => pos + 1,
            None => self.buffer.len() - MARKER_TAIL,
        };
        self.buffer.advance(dropped);
        FrameEvent::Discarded { len: dropped }
    }
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(MARKER_LEN)
        .position(|window| window == FRAME_MARKER)
}

/// Iterator returned by [`StreamReassembler::events`].
pub struct Events<'a> {
    reassembler: &'a mut StreamReassembler,
}

impl Iterator for Events<'_> {
    type Item = FrameEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.reassembler.next_event()
    }
}
