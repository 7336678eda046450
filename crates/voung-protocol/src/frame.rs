use crate::commands::CommandCode;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;
use voung_core::{Error, Result, constants::*};

/// Frame is one decoded unit of the Voung wire protocol.
///
/// A frame only carries the header fields and the payload; the marker,
/// length byte and checksum are produced by [`encode`] and verified by
/// [`decode`].
///
/// # Wire Format
/// ```text
/// offset 0..3  : ASCII marker "WKLY"
/// offset 4     : frame length (total bytes, including marker and checksum)
/// offset 5     : board address
/// offset 6     : command code
/// offset 7..n-2: payload
/// offset n-1   : checksum (XOR of bytes 0..n-2)
/// ```
///
/// # Basic Usage
/// ```
/// use voung_protocol::{Frame, CommandCode};
///
/// let frame = Frame::new(1, CommandCode::Heartbeat.as_u8(), vec![0x00u8]).unwrap();
/// let bytes = frame.encode().unwrap();
///
/// assert_eq!(&bytes[..4], b"WKLY");
/// assert_eq!(bytes[4] as usize, bytes.len());
///
/// let (decoded, consumed) = voung_protocol::frame::decode(&bytes).unwrap();
/// assert_eq!(decoded, frame);
/// assert_eq!(consumed, 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Numeric board address from the frame header.
    pub board_address: u8,

    /// Raw command byte. Unknown codes are preserved so the dispatcher
    /// can log them.
    pub command: u8,

    /// Payload bytes, at most [`MAX_PAYLOAD_LEN`].
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, rejecting payloads that cannot be encoded.
    pub fn new(board_address: u8, command: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        check_payload_len(payload.len())?;
        Ok(Frame {
            board_address,
            command,
            payload,
        })
    }

    /// Build a response frame whose payload starts with `status`.
    pub fn response(board_address: u8, command: u8, status: u8, extra: &[u8]) -> Result<Self> {
        let mut payload = BytesMut::with_capacity(1 + extra.len());
        payload.put_u8(status);
        payload.extend_from_slice(extra);
        Frame::new(board_address, command, payload.freeze())
    }

    /// Decode the command byte, if it is a known code.
    pub fn command_code(&self) -> Option<CommandCode> {
        CommandCode::try_from(self.command).ok()
    }

    /// Total encoded size in bytes (the value of the length byte).
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode this frame into wire bytes.
    pub fn encode(&self) -> Result<Bytes> {
        encode(self.board_address, self.command, &self.payload)
    }

    /// Append the wire bytes of this frame to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        write_frame(self.board_address, self.command, &self.payload, dst)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "addr={} cmd=0x{:02X} payload={} bytes",
            self.board_address,
            self.command,
            self.payload.len()
        )
    }
}

/// Reasons a byte sequence is not a valid frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedFrame {
    #[error("Frame too short: {len} bytes (need at least {FRAME_OVERHEAD})")]
    TooShort { len: usize },

    #[error("Frame does not start with the WKLY marker")]
    BadMarker,

    #[error("Invalid frame length byte: {declared}")]
    InvalidLength { declared: u8 },

    #[error("Truncated frame: declared {declared} bytes, {available} available")]
    Truncated { declared: usize, available: usize },

    #[error("Checksum mismatch: computed 0x{expected:02X}, frame carries 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// XOR of every byte in `bytes` (0 for an empty slice).
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Encode a frame into wire bytes.
///
/// # Errors
/// Returns `Error::PayloadTooLarge` if `payload` exceeds 247 bytes.
pub fn encode(board_address: u8, command: u8, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());
    write_frame(board_address, command, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode a response: the status byte followed by `extra`.
pub fn create_response(board_address: u8, command: u8, status: u8, extra: &[u8]) -> Result<Bytes> {
    Frame::response(board_address, command, status, extra)?.encode()
}

/// Decode one frame from the start of `buffer`.
///
/// Only the first `declared length` bytes are examined; trailing bytes are
/// left for the caller. On success returns the frame and the number of
/// bytes it occupied.
pub fn decode(buffer: &[u8]) -> std::result::Result<(Frame, usize), MalformedFrame> {
    if buffer.len() < FRAME_OVERHEAD {
        return Err(MalformedFrame::TooShort { len: buffer.len() });
    }

    if &buffer[..MARKER_LEN] != FRAME_MARKER {
        return Err(MalformedFrame::BadMarker);
    }

    let declared = buffer[LENGTH_OFFSET];
    let len = declared as usize;
    if len < FRAME_OVERHEAD {
        return Err(MalformedFrame::InvalidLength { declared });
    }

    if buffer.len() < len {
        return Err(MalformedFrame::Truncated {
            declared: len,
            available: buffer.len(),
        });
    }

    let expected = checksum(&buffer[..len - 1]);
    let actual = buffer[len - 1];
    if expected != actual {
        return Err(MalformedFrame::ChecksumMismatch { expected, actual });
    }

    let frame = Frame {
        board_address: buffer[ADDRESS_OFFSET],
        command: buffer[COMMAND_OFFSET],
        payload: Bytes::copy_from_slice(&buffer[PAYLOAD_OFFSET..len - 1]),
    };

    Ok((frame, len))
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLarge {
            size: len,
            max_size: MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}

fn write_frame(board_address: u8, command: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    check_payload_len(payload.len())?;

    let start = dst.len();
    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.extend_from_slice(FRAME_MARKER);
    dst.put_u8((FRAME_OVERHEAD + payload.len()) as u8);
    dst.put_u8(board_address);
    dst.put_u8(command);
    dst.extend_from_slice(payload);
    let sum = checksum(&dst[start..]);
    dst.put_u8(sum);

    Ok(())
}
