//! End-to-end transport tests over real unix sockets: handshake with
//! endianness negotiation, framed traffic, timeouts and lifecycle.

use std::time::Duration;

use codec::{
    decode_frame, encode_frame, PacketVersionEntry, PacketVersionTable, StreamMetadata,
    TargetEndianness,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use transport::{PipeListener, PipeServerConfig, PipeSession, TransportError};

fn test_config(dir: &tempfile::TempDir) -> PipeServerConfig {
    PipeServerConfig {
        path: dir.path().join("pipe.sock"),
        ..Default::default()
    }
}

fn producer_metadata() -> StreamMetadata {
    StreamMetadata {
        version: 1,
        max_data_len: 1024,
        pid: 42,
        info: None,
        hardware_version: None,
        software_version: None,
        process_name: Some("producer".to_owned()),
        packet_versions: PacketVersionTable::new(vec![PacketVersionEntry {
            family: 1,
            packet_id: 2,
            version: 3,
        }]),
    }
}

/// Frame the metadata body the way a producer of the given byte order
/// would: a zero identifier word, the body length, then the body.
fn metadata_frame(endianness: TargetEndianness) -> Vec<u8> {
    let body = producer_metadata().encode(endianness);
    let mut frame = Vec::with_capacity(8 + body.len());
    frame.extend_from_slice(&[0u8; 4]);
    let length = body.len() as u32;
    match endianness {
        TargetEndianness::BigWire => frame.extend_from_slice(&length.to_be_bytes()),
        TargetEndianness::LittleWire => frame.extend_from_slice(&length.to_le_bytes()),
    }
    frame.extend_from_slice(&body);
    frame
}

async fn handshaken_pair(
    dir: &tempfile::TempDir,
    endianness: TargetEndianness,
) -> (PipeSession, UnixStream) {
    let listener = PipeListener::bind(test_config(dir)).unwrap();
    let path = listener.local_path().to_path_buf();

    let client_task = tokio::spawn(async move {
        let mut client = UnixStream::connect(&path).await.unwrap();
        client.write_all(&metadata_frame(endianness)).await.unwrap();
        client
    });

    let session = listener.accept().await.unwrap();
    session.wait_for_stream_metadata().await.unwrap();
    let client = client_task.await.unwrap();
    (session, client)
}

#[tokio::test]
async fn a_big_endian_producer_is_negotiated_and_exposed() {
    let dir = tempfile::tempdir().unwrap();
    let (session, _client) = handshaken_pair(&dir, TargetEndianness::BigWire).await;

    assert_eq!(session.endianness(), Some(TargetEndianness::BigWire));
    let metadata = session.stream_metadata().unwrap();
    assert_eq!(metadata.pid, 42);
    assert_eq!(metadata.version, 1);
    assert_eq!(metadata.process_name.as_deref(), Some("producer"));

    let entries = metadata.packet_versions.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        (entries[0].family, entries[0].packet_id, entries[0].version),
        (1, 2, 3)
    );
}

#[tokio::test]
async fn a_little_endian_producer_is_negotiated_too() {
    let dir = tempfile::tempdir().unwrap();
    let (session, _client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;
    assert_eq!(session.endianness(), Some(TargetEndianness::LittleWire));
    assert_eq!(session.stream_metadata().unwrap().pid, 42);
}

#[tokio::test]
async fn frames_round_trip_both_ways_after_the_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let (session, mut client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;

    // producer -> collector
    let payload = vec![7u8; 64];
    let frame = encode_frame(3, 130, &payload, TargetEndianness::LittleWire);
    client.write_all(&frame).await.unwrap();

    let packet = session.wait_for_packet(1000).await.unwrap().unwrap();
    assert_eq!(packet.family(), 3);
    assert_eq!(packet.packet_id(), 130);
    assert_eq!(packet.data(), payload.as_slice());

    // collector -> producer
    session.send_packet(0, 1, &[]).await.unwrap();
    let mut ack = [0u8; 8];
    client.read_exact(&mut ack).await.unwrap();
    let (family, id, body) = decode_frame(&ack, TargetEndianness::LittleWire).unwrap();
    assert_eq!((family, id), (0, 1));
    assert!(body.is_empty());
}

#[tokio::test]
async fn an_oversized_send_is_refused_locally() {
    let dir = tempfile::tempdir().unwrap();
    let (session, _client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;

    // max_data_len is 1024 in the producer's metadata
    let err = session.send_packet(0, 2, &[0u8; 2048]).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::PayloadTooLarge { length: 2048, max: 1024 }
    ));
}

#[tokio::test]
async fn an_idle_wait_times_out_with_no_packet() {
    let dir = tempfile::tempdir().unwrap();
    let (session, _client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;

    let result = session.wait_for_packet(50).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn a_peer_hangup_is_a_framing_error() {
    let dir = tempfile::tempdir().unwrap();
    let (session, client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;
    drop(client);

    let err = session.wait_for_packet(1000).await.unwrap_err();
    assert!(matches!(err, TransportError::ShortRead { got: 0, .. }));
}

#[tokio::test]
async fn a_partial_header_is_a_short_read() {
    let dir = tempfile::tempdir().unwrap();
    let (session, mut client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;

    client.write_all(&[1, 2, 3]).await.unwrap();
    client.shutdown().await.unwrap();

    let err = session.wait_for_packet(1000).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::ShortRead { need: 8, got: 3, .. }
    ));
}

#[tokio::test]
async fn the_endpoint_name_cannot_be_bound_twice() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let _listener = PipeListener::bind(config.clone()).unwrap();

    let err = PipeListener::bind(config).unwrap_err();
    assert!(matches!(err, TransportError::Bind { .. }));
}

#[tokio::test]
async fn try_accept_polls_without_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let listener = PipeListener::bind(test_config(&dir)).unwrap();

    assert!(listener.try_accept().unwrap().is_none());

    let path = listener.local_path().to_path_buf();
    let _client = UnixStream::connect(&path).await.unwrap();

    let mut accepted = None;
    for _ in 0..100 {
        if let Some(session) = listener.try_accept().unwrap() {
            accepted = Some(session);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(accepted.is_some());
}

#[tokio::test]
async fn close_abandons_an_in_flight_wait() {
    let dir = tempfile::tempdir().unwrap();
    let (session, _client) = handshaken_pair(&dir, TargetEndianness::LittleWire).await;
    let session = std::sync::Arc::new(session);

    let waiter = {
        let session = std::sync::Arc::clone(&session);
        tokio::spawn(async move { session.wait_for_packet(60_000).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.close().await;

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(TransportError::Closed)));
}
