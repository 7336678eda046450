//! Integration tests for VoungCodec with Tokio streams.
//!
//! These tests run the codec over in-memory duplex streams to cover
//! partial reads, multiple frames per write and recovery from corrupted
//! input.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Framed, FramedRead};
use voung_protocol::frame::{checksum, encode};
use voung_protocol::{CommandCode, Frame, FrameEvent, MalformedFrame, VoungCodec};

/// Helper function to create a framed duplex stream for testing.
fn create_framed_duplex(
    buffer_size: usize,
) -> (
    Framed<DuplexStream, VoungCodec>,
    Framed<DuplexStream, VoungCodec>,
) {
    let (client, server) = tokio::io::duplex(buffer_size);
    (
        Framed::new(client, VoungCodec::new()),
        Framed::new(server, VoungCodec::new()),
    )
}

async fn next_frame(framed: &mut Framed<DuplexStream, VoungCodec>) -> Frame {
    match framed.next().await {
        Some(Ok(FrameEvent::Frame(frame))) => frame,
        other => panic!("expected frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_codec_roundtrip_heartbeat() {
    let (mut board, mut server) = create_framed_duplex(1024);

    let heartbeat = Frame::new(1, CommandCode::Heartbeat.as_u8(), b"BOARD001".to_vec()).unwrap();
    board.send(heartbeat.clone()).await.unwrap();

    assert_eq!(next_frame(&mut server).await, heartbeat);
}

#[tokio::test]
async fn test_codec_example_frame() {
    let (mut board, server) = tokio::io::duplex(64);
    let mut server = FramedRead::new(server, VoungCodec::new());

    let mut bytes = vec![0x57, 0x4B, 0x4C, 0x59, 0x09, 0x01, 0x80, 0x00];
    bytes.push(checksum(&bytes));
    board.write_all(&bytes).await.unwrap();

    match server.next().await {
        Some(Ok(FrameEvent::Frame(frame))) => {
            assert_eq!(frame.board_address, 1);
            assert_eq!(frame.command, 0x80);
            assert_eq!(frame.payload.as_ref(), &[0x00]);
        }
        other => panic!("expected frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_codec_partial_writes() {
    let (mut board, server) = tokio::io::duplex(64);
    let mut server = FramedRead::new(server, VoungCodec::new());

    let bytes = encode(2, CommandCode::StatusChange.as_u8(), &[4, 0]).unwrap();
    let reader = tokio::spawn(async move {
        match server.next().await {
            Some(Ok(FrameEvent::Frame(frame))) => frame,
            other => panic!("expected frame, got {:?}", other),
        }
    });

    for b in bytes.iter() {
        board.write_all(std::slice::from_ref(b)).await.unwrap();
        board.flush().await.unwrap();
        tokio::task::yield_now().await;
    }

    let frame = reader.await.unwrap();
    assert_eq!(frame.payload.as_ref(), &[4, 0]);
}

#[tokio::test]
async fn test_codec_multiple_frames_single_write() {
    let (mut board, server) = tokio::io::duplex(1024);
    let mut server = FramedRead::new(server, VoungCodec::new());

    let mut bytes = encode(1, 0x80, b"BOARD001").unwrap().to_vec();
    bytes.extend_from_slice(&encode(1, 0x85, &[1, 1]).unwrap());
    bytes.extend_from_slice(&encode(1, 0xD0, &[0x17]).unwrap());
    board.write_all(&bytes).await.unwrap();
    drop(board);

    let mut commands = Vec::new();
    while let Some(event) = server.next().await {
        if let FrameEvent::Frame(frame) = event.unwrap() {
            commands.push(frame.command);
        }
    }

    assert_eq!(commands, vec![0x80, 0x85, 0xD0]);
}

#[tokio::test]
async fn test_codec_recovers_after_corruption() {
    let (mut board, server) = tokio::io::duplex(1024);
    let mut server = FramedRead::new(server, VoungCodec::new());

    let mut corrupted = encode(1, 0x80, b"BOARD001").unwrap().to_vec();
    corrupted[8] ^= 0x20;

    let mut bytes = b"\xFF\xFE".to_vec();
    bytes.extend_from_slice(&corrupted);
    bytes.extend_from_slice(&encode(1, 0x80, b"BOARD002").unwrap());
    board.write_all(&bytes).await.unwrap();
    drop(board);

    let mut events = Vec::new();
    while let Some(event) = server.next().await {
        events.push(event.unwrap());
    }

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], FrameEvent::Discarded { len: 2 });
    assert!(matches!(
        events[1],
        FrameEvent::Malformed(MalformedFrame::ChecksumMismatch { .. })
    ));
    match &events[2] {
        FrameEvent::Frame(frame) => assert_eq!(frame.payload.as_ref(), b"BOARD002"),
        other => panic!("expected frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_codec_stream_ends_cleanly() {
    let (board, server) = tokio::io::duplex(64);
    let mut server = FramedRead::new(server, VoungCodec::new());
    drop(board);

    assert!(server.next().await.is_none());
}
