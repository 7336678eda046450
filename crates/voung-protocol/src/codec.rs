//! Tokio codec for Voung protocol framing.
//!
//! `VoungCodec` is a thin layer over [`StreamReassembler`] so a socket can
//! be wrapped in `FramedRead`/`Framed`:
//!
//! ```text
//! TCP Stream -> Decoder -> FrameEvent (frame, malformed or discarded)
//! Frame -> Encoder -> TCP Stream (marker, length and checksum added)
//! ```
//!
//! Malformed input is never a decode error. It surfaces as a
//! [`FrameEvent`] so the connection can log it and keep reading; only I/O
//! failures end the stream.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use voung_protocol::{CommandCode, Frame, FrameEvent, VoungCodec};
//! use futures::{SinkExt, StreamExt};
//!
//! # async fn example() -> voung_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:8585").await?;
//! let mut framed = Framed::new(stream, VoungCodec::new());
//!
//! let heartbeat = Frame::new(1, CommandCode::Heartbeat.as_u8(), b"BOARD001".to_vec())?;
//! framed.send(heartbeat).await?;
//!
//! if let Some(Ok(FrameEvent::Frame(ack))) = framed.next().await {
//!     println!("Received: {}", ack);
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{Frame, FrameEvent, StreamReassembler};
use voung_core::{Error, Result};

/// Tokio codec for Voung protocol frames.
#[derive(Debug, Default)]
pub struct VoungCodec {
    reassembler: StreamReassembler,
}

impl VoungCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held by the codec that have not produced an event yet.
    pub fn buffered_len(&self) -> usize {
        self.reassembler.buffered_len()
    }
}

impl Decoder for VoungCodec {
    type Item = FrameEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            // The reassembler owns every received byte from here on.
            self.reassembler.feed(src);
            src.clear();
        }

        Ok(self.reassembler.next_event())
    }
}

impl Encoder<Frame> for VoungCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst)
    }
}

impl Encoder<&Frame> for VoungCodec {
    type Error = Error;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst)
    }
}
