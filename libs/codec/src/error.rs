//! Codec-level errors
//!
//! Decode failures are local to the field or record being interpreted:
//! the caller decides whether to drop the field, abort the packet or
//! tear down the connection. Each variant carries enough context to
//! diagnose the byte stream without a debugger.

use thiserror::Error;

/// Errors produced while encoding or decoding protocol bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer ended before the value being decoded.
    #[error("truncated buffer: need {need} bytes, got {got} (context: {context})")]
    Truncated {
        need: usize,
        got: usize,
        context: String,
    },

    /// A character is not admitted by the active string policy.
    #[error("invalid character {ch:?} for the {policy} string policy")]
    InvalidChar { ch: char, policy: &'static str },

    /// The handshake magic matched in neither byte order.
    #[error("unrecognised stream magic {actual:#010x} in either byte order")]
    InvalidMagic { actual: u32 },

    /// A metadata offset points outside the payload.
    #[error("{field} offset {offset} is outside the {payload_len}-byte payload")]
    InvalidOffset {
        offset: usize,
        payload_len: usize,
        field: &'static str,
    },

    /// A metadata string ran to the end of the payload without a NUL.
    #[error("string at offset {offset} is not NUL-terminated")]
    StringNotTerminated { offset: usize },

    /// A timeline record declared an id outside the known set.
    #[error("unknown timeline declaration id {decl_id} (known ids are 0..=4)")]
    UnknownDeclId { decl_id: u32 },

    /// A relationship record declared an unknown relationship type.
    #[error("unknown relationship type {value}")]
    UnknownRelationshipType { value: u32 },

    /// A decoded string was not valid UTF-8 / 7-bit ASCII.
    #[error("string at offset {offset} is not valid text")]
    InvalidString { offset: usize },

    /// The thread-id width is outside the negotiable set.
    #[error("unsupported thread id width {width} (must be 4 or 8 bytes)")]
    UnsupportedThreadIdWidth { width: u32 },
}

impl CodecError {
    /// Create a Truncated error with decode context.
    pub fn truncated(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::Truncated {
            need,
            got,
            context: context.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
