//! Timeline command handlers
//!
//! The two handlers a collector registers for the timeline family:
//! the directory handler learns the producer's stream widths and
//! declared record kinds, the message handler feeds packet payloads
//! through the [`TimelineDecoder`] into a shared [`TimelineModel`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use codec::{
    TargetEndianness, TimelineDecoder, TimelineDirectory, TimelineModel,
    TIMELINE_DIRECTORY_PACKET_ID, TIMELINE_FAMILY, TIMELINE_MESSAGE_PACKET_ID,
};
use parking_lot::Mutex;
use tracing::debug;
use types::Packet;

use crate::dispatch::{CommandHandler, CommandHandlerKey};
use crate::error::Result;

/// Thread-id width assumed until the directory declares one.
pub const DEFAULT_THREAD_ID_SIZE: u32 = 8;

/// Handles the timeline message directory packet (family 1, id 0).
pub struct TimelineDirectoryHandler {
    key: CommandHandlerKey,
    endianness: TargetEndianness,
    thread_id_size: Arc<AtomicU32>,
    directory: Arc<Mutex<Option<TimelineDirectory>>>,
}

impl TimelineDirectoryHandler {
    pub fn new(
        version: u32,
        endianness: TargetEndianness,
        thread_id_size: Arc<AtomicU32>,
    ) -> Self {
        Self {
            key: CommandHandlerKey::new(TIMELINE_FAMILY, TIMELINE_DIRECTORY_PACKET_ID, version),
            endianness,
            thread_id_size,
            directory: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared slot the parsed directory lands in.
    pub fn directory(&self) -> Arc<Mutex<Option<TimelineDirectory>>> {
        Arc::clone(&self.directory)
    }
}

impl CommandHandler for TimelineDirectoryHandler {
    fn key(&self) -> CommandHandlerKey {
        self.key
    }

    fn handle(&mut self, packet: Packet) -> Result<()> {
        let directory = TimelineDirectory::parse(packet.data(), self.endianness)?;
        self.thread_id_size
            .store(u32::from(directory.thread_id_bytes), Ordering::Release);
        debug!(
            declarations = directory.declarations.len(),
            thread_id_bytes = directory.thread_id_bytes,
            "timeline directory received"
        );
        *self.directory.lock() = Some(directory);
        Ok(())
    }
}

/// Handles timeline message packets (family 1, id 1), demultiplexing
/// the nested record stream into the shared model.
pub struct TimelineMessageHandler {
    key: CommandHandlerKey,
    endianness: TargetEndianness,
    thread_id_size: Arc<AtomicU32>,
    model: Arc<Mutex<TimelineModel>>,
}

impl TimelineMessageHandler {
    pub fn new(
        version: u32,
        endianness: TargetEndianness,
        thread_id_size: Arc<AtomicU32>,
        model: Arc<Mutex<TimelineModel>>,
    ) -> Self {
        Self {
            key: CommandHandlerKey::new(TIMELINE_FAMILY, TIMELINE_MESSAGE_PACKET_ID, version),
            endianness,
            thread_id_size,
            model,
        }
    }
}

impl CommandHandler for TimelineMessageHandler {
    fn key(&self) -> CommandHandlerKey {
        self.key
    }

    fn handle(&mut self, packet: Packet) -> Result<()> {
        let width = self.thread_id_size.load(Ordering::Acquire);
        let decoder = TimelineDecoder::new(self.endianness, width)?;
        decoder.decode(packet.data(), &mut *self.model.lock())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::wire::{put_u32, put_u64};
    use codec::DeclId;

    const E: TargetEndianness = TargetEndianness::LittleWire;

    #[test]
    fn the_directory_updates_the_negotiated_thread_id_width() {
        let width = Arc::new(AtomicU32::new(DEFAULT_THREAD_ID_SIZE));
        let mut handler = TimelineDirectoryHandler::new(1, E, Arc::clone(&width));
        let directory_slot = handler.directory();

        let mut payload = vec![4u8, 8, 4];
        put_u32(&mut payload, 0, E); // no declarations
        handler.handle(Packet::new(0, payload)).unwrap();

        assert_eq!(width.load(Ordering::Acquire), 4);
        assert!(directory_slot.lock().is_some());
    }

    #[test]
    fn messages_decode_with_the_declared_width() {
        let width = Arc::new(AtomicU32::new(4));
        let model = Arc::new(Mutex::new(TimelineModel::default()));
        let mut handler = TimelineMessageHandler::new(1, E, width, Arc::clone(&model));

        let mut payload = Vec::new();
        put_u32(&mut payload, DeclId::Event as u32, E);
        put_u64(&mut payload, 1000, E); // timestamp
        put_u32(&mut payload, 77, E); // 4-byte thread id
        put_u64(&mut payload, 42, E); // guid
        handler.handle(Packet::new(0, payload)).unwrap();

        let model = model.lock();
        assert_eq!(model.events.len(), 1);
        assert_eq!(model.events[0].thread_id, 77);
    }
}
