//! Transport session
//!
//! One accepted connection, owned end to end: the stream metadata
//! handshake with endianness auto-detection, then framed send and
//! receive with optional raw-byte echo and timeout-bounded waits.
//!
//! Concurrency contract: one lock per direction. A single reader task
//! drives the receive path while another task may send; the two
//! directions never contend with each other. [`PipeSession::close`]
//! flips a shutdown flag that every in-flight wait observes.

use std::time::Duration;

use codec::{
    encode_frame, resolve_endianness, wire, StreamMetadata, TargetEndianness,
    STREAM_METADATA_HEADER_SIZE,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex as StateMutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};
use types::Packet;

use crate::error::{Result, TransportError};

/// Connection lifecycle. The session is constructed `Connected`,
/// enters `AwaitingMetadata` when the handshake read begins, serves
/// framed traffic in `Ready` and ends in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    AwaitingMetadata,
    Ready,
    Closed,
}

/// Direction tag attached to echoed raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Sending,
    ReceivedHeader,
    ReceivedData,
}

/// One accepted collector connection.
pub struct PipeSession {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    state: StateMutex<SessionState>,
    endianness: OnceCell<TargetEndianness>,
    metadata: OnceCell<StreamMetadata>,
    echo_packets: bool,
    shutdown: watch::Sender<bool>,
}

impl PipeSession {
    pub(crate) fn new(stream: UnixStream, echo_packets: bool) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (shutdown, _) = watch::channel(false);
        Self {
            reader: Mutex::new(read_half),
            writer: Mutex::new(write_half),
            state: StateMutex::new(SessionState::Connected),
            endianness: OnceCell::new(),
            metadata: OnceCell::new(),
            echo_packets,
            shutdown,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Connection byte order, known once the handshake has completed.
    pub fn endianness(&self) -> Option<TargetEndianness> {
        self.endianness.get().copied()
    }

    /// The handshake record, available once the session is `Ready`.
    pub fn stream_metadata(&self) -> Option<&StreamMetadata> {
        self.metadata.get()
    }

    /// Perform the stream metadata handshake.
    ///
    /// Reads the first frame on the connection, which must be the
    /// stream metadata packet. The magic word is tried big-endian
    /// first, then little-endian; whichever matches fixes the byte
    /// order for the rest of the connection. Any failure closes the
    /// session.
    pub async fn wait_for_stream_metadata(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                SessionState::Connected => *state = SessionState::AwaitingMetadata,
                SessionState::AwaitingMetadata => {
                    return Err(TransportError::handshake("handshake already in progress"))
                }
                SessionState::Ready => {
                    return Err(TransportError::handshake("handshake already complete"))
                }
                SessionState::Closed => return Err(TransportError::Closed),
            }
        }

        match self.receive_stream_metadata().await {
            Ok(()) => {
                *self.state.lock() = SessionState::Ready;
                Ok(())
            }
            Err(error) => {
                self.close().await;
                Err(error)
            }
        }
    }

    async fn receive_stream_metadata(&self) -> Result<()> {
        let mut reader = self.reader.lock().await;
        debug!("waiting for stream metadata");

        let mut header = [0u8; 8];
        self.read_full(&mut reader, &mut header, "stream metadata frame header")
            .await?;
        self.echo(PacketDirection::ReceivedHeader, &header);

        // The stream metadata identifier is zero in either byte order.
        if header[..4] != [0u8; 4] {
            return Err(TransportError::handshake(
                "first frame on the connection is not stream metadata",
            ));
        }

        let mut magic = [0u8; 4];
        self.read_full(&mut reader, &mut magic, "stream metadata magic")
            .await?;
        self.echo(PacketDirection::ReceivedData, &magic);
        let endianness = resolve_endianness(&magic)
            .map_err(|_| TransportError::handshake("unrecognised magic in either byte order"))?;

        // Only now can the declared length be interpreted.
        let declared = wire::read_u32(&header, 4, endianness)? as usize;
        if declared < STREAM_METADATA_HEADER_SIZE {
            return Err(TransportError::handshake(format!(
                "stream metadata length {declared} is shorter than the {STREAM_METADATA_HEADER_SIZE}-byte fixed header"
            )));
        }

        let mut body = vec![0u8; declared];
        body[..4].copy_from_slice(&magic);
        self.read_full(&mut reader, &mut body[4..], "stream metadata body")
            .await?;
        self.echo(PacketDirection::ReceivedData, &body[4..]);

        let metadata = StreamMetadata::parse(&body, endianness)?;
        info!(
            pid = metadata.pid,
            version = metadata.version,
            max_data_len = metadata.max_data_len,
            ?endianness,
            "stream metadata received"
        );
        let _ = self.endianness.set(endianness);
        let _ = self.metadata.set(metadata);
        Ok(())
    }

    /// Wait up to `timeout_ms` for the next packet.
    ///
    /// The timeout bounds only the wait for the first header byte and
    /// expiry yields `Ok(None)`. Once any header byte has arrived the
    /// remaining header and exactly `length` payload bytes are read
    /// without a further bound; a short read is an error.
    pub async fn wait_for_packet(&self, timeout_ms: u32) -> Result<Option<Packet>> {
        let endianness = self.ensure_ready()?;
        let mut reader = self.reader.lock().await;

        let mut header = [0u8; 8];
        let mut shutdown = self.shutdown.subscribe();
        let first = tokio::select! {
            result = tokio::time::timeout(
                Duration::from_millis(u64::from(timeout_ms)),
                reader.read(&mut header),
            ) => match result {
                Err(_elapsed) => return Ok(None),
                Ok(Ok(0)) => {
                    return Err(TransportError::short_read(header.len(), 0, "packet header"))
                }
                Ok(Ok(read)) => read,
                Ok(Err(e)) => return Err(TransportError::io("reading packet header", e)),
            },
            _ = shutdown.changed() => return Err(TransportError::Closed),
        };
        if first < header.len() {
            self.read_full(&mut reader, &mut header[first..], "packet header")
                .await
                .map_err(|error| match error {
                    // report the shortfall against the whole header
                    TransportError::ShortRead { got, .. } => {
                        TransportError::short_read(header.len(), first + got, "packet header")
                    }
                    other => other,
                })?;
        }
        self.echo(PacketDirection::ReceivedHeader, &header);

        let header_word = wire::read_u32(&header, 0, endianness)?;
        let length = wire::read_u32(&header, 4, endianness)? as usize;

        let mut payload = vec![0u8; length];
        if length > 0 {
            self.read_full(&mut reader, &mut payload, "packet payload")
                .await?;
            self.echo(PacketDirection::ReceivedData, &payload);
        }

        let packet = Packet::new(header_word, payload);
        if self.echo_packets {
            debug!(
                packet_id = packet.packet_id(),
                length = packet.length(),
                "processing packet"
            );
        }
        Ok(Some(packet))
    }

    /// Build and send one frame as a single logical write.
    pub async fn send_packet(&self, family: u32, packet_id: u32, payload: &[u8]) -> Result<()> {
        let endianness = self.ensure_ready()?;
        if let Some(metadata) = self.metadata.get() {
            if metadata.max_data_len != 0 && payload.len() > metadata.max_data_len as usize {
                return Err(TransportError::PayloadTooLarge {
                    length: payload.len(),
                    max: metadata.max_data_len,
                });
            }
        }

        let frame = encode_frame(family, packet_id, payload, endianness);
        self.echo(PacketDirection::Sending, &frame);

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::io("writing packet", e))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::io("flushing packet", e))?;
        Ok(())
    }

    /// Release the connection. Idempotent; all in-flight waits observe
    /// the shutdown and return [`TransportError::Closed`].
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == SessionState::Closed {
                return;
            }
            *state = SessionState::Closed;
        }
        self.shutdown.send_replace(true);

        let mut writer = self.writer.lock().await;
        if let Err(error) = writer.shutdown().await {
            debug!(%error, "socket shutdown while closing session");
        }
        debug!("session closed");
    }

    fn ensure_ready(&self) -> Result<TargetEndianness> {
        match *self.state.lock() {
            SessionState::Ready => {}
            SessionState::Closed => return Err(TransportError::Closed),
            SessionState::Connected | SessionState::AwaitingMetadata => {
                return Err(TransportError::handshake(
                    "stream metadata handshake not complete",
                ))
            }
        }
        self.endianness
            .get()
            .copied()
            .ok_or_else(|| TransportError::handshake("connection endianness not negotiated"))
    }

    /// Blocking read of exactly `buf.len()` bytes, abandoned if the
    /// session closes underneath it.
    async fn read_full(
        &self,
        reader: &mut OwnedReadHalf,
        buf: &mut [u8],
        context: &'static str,
    ) -> Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        let mut filled = 0;
        while filled < buf.len() {
            let read = tokio::select! {
                result = reader.read(&mut buf[filled..]) => {
                    result.map_err(|e| TransportError::io(context, e))?
                }
                _ = shutdown.changed() => return Err(TransportError::Closed),
            };
            if read == 0 {
                return Err(TransportError::short_read(buf.len(), filled, context));
            }
            filled += read;
        }
        Ok(())
    }

    fn echo(&self, direction: PacketDirection, bytes: &[u8]) {
        if !self.echo_packets {
            return;
        }
        let tag = match direction {
            PacketDirection::Sending => "TX",
            PacketDirection::ReceivedHeader => "RX header",
            PacketDirection::ReceivedData => "RX data",
        };
        info!("{tag} {} bytes : {}", bytes.len(), hex::encode(bytes));
    }
}
