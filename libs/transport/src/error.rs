//! Transport error types
//!
//! Connection setup failures are fatal to constructing the listener;
//! handshake and framing failures are fatal to their session; dispatch
//! failures are per-packet and surfaced to the caller, who decides
//! whether the loop continues.

use std::path::PathBuf;

use thiserror::Error;

/// Main transport error type.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The named endpoint could not be created or bound.
    #[error("failed to bind {path:?}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Generic I/O failure on the connection.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// The stream metadata handshake failed.
    #[error("handshake error: {message}")]
    Handshake { message: String },

    /// The session was closed; in-flight waits observe this.
    #[error("session closed")]
    Closed,

    /// The peer stopped sending mid-header or mid-payload.
    #[error("short read while {context}: need {need} bytes, got {got}")]
    ShortRead {
        need: usize,
        got: usize,
        context: String,
    },

    /// An outgoing payload exceeds the negotiated frame limit.
    #[error("payload of {length} bytes exceeds the negotiated maximum of {max}")]
    PayloadTooLarge { length: usize, max: u32 },

    /// No functor is registered for an observed packet kind.
    #[error("no handler registered for family {family}, id {packet_id}, version {version}")]
    NoHandler {
        family: u32,
        packet_id: u32,
        version: u32,
    },

    /// A functor is already registered under this key.
    #[error("a handler is already registered for family {family}, id {packet_id}, version {version}")]
    DuplicateHandler {
        family: u32,
        packet_id: u32,
        version: u32,
    },

    /// A payload failed to decode.
    #[error(transparent)]
    Codec(#[from] codec::CodecError),
}

impl TransportError {
    /// Create an I/O error with operation context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a bind error for a named endpoint.
    pub fn bind(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Bind {
            path: path.into(),
            source,
        }
    }

    /// Create a handshake error.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Create a short-read framing error.
    pub fn short_read(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::ShortRead {
            need,
            got,
            context: context.into(),
        }
    }
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
