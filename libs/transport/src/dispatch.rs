//! Command dispatch registry
//!
//! Incoming packets are routed by `(family, id, version)` to handler
//! objects. The registry owns its handlers outright, so registration
//! transfers ownership and there are no dangling references to worry
//! about. An unregistered key on lookup is an error, never a silent
//! skip: an unexpected packet means the peer and this process disagree
//! about the protocol.

use std::collections::HashMap;

use tracing::debug;
use types::Packet;

use crate::error::{Result, TransportError};

/// Dispatch key: all three fields participate in equality, ordering
/// and the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandHandlerKey {
    pub family_id: u32,
    pub packet_id: u32,
    pub version: u32,
}

impl CommandHandlerKey {
    pub fn new(family_id: u32, packet_id: u32, version: u32) -> Self {
        Self {
            family_id,
            packet_id,
            version,
        }
    }
}

/// A registered packet handler. Each handler knows its own key and
/// consumes packets by move.
pub trait CommandHandler: Send {
    fn key(&self) -> CommandHandlerKey;
    fn handle(&mut self, packet: Packet) -> Result<()>;
}

/// Owning dispatch table keyed by `(family, id, version)`.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<CommandHandlerKey, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, taking ownership. Fails if a handler is
    /// already registered under an identical key.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) -> Result<()> {
        let key = handler.key();
        if self.handlers.contains_key(&key) {
            return Err(TransportError::DuplicateHandler {
                family: key.family_id,
                packet_id: key.packet_id,
                version: key.version,
            });
        }
        debug!(?key, "registered command handler");
        self.handlers.insert(key, handler);
        Ok(())
    }

    /// Dispatch one packet to the handler registered for its key.
    pub fn handle(
        &mut self,
        family: u32,
        packet_id: u32,
        version: u32,
        packet: Packet,
    ) -> Result<()> {
        let key = CommandHandlerKey::new(family, packet_id, version);
        let handler = self
            .handlers
            .get_mut(&key)
            .ok_or(TransportError::NoHandler {
                family,
                packet_id,
                version,
            })?;
        handler.handle(packet)
    }

    pub fn contains(&self, family: u32, packet_id: u32, version: u32) -> bool {
        self.handlers
            .contains_key(&CommandHandlerKey::new(family, packet_id, version))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
