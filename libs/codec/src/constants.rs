//! Protocol-level constants
//!
//! These values are part of the wire format and must stay stable across
//! producer and collector implementations.

/// Magic value carried in the first word of the stream metadata body.
///
/// This is the only self-describing field in the protocol: the
/// collector tries both byte orders against it to learn the
/// connection's endianness.
pub const PIPE_MAGIC: u32 = 0x4549_5434;

/// Size in bytes of the fixed part of the stream metadata body
/// (magic through the trailing reserved word, ten 32-bit words).
pub const STREAM_METADATA_HEADER_SIZE: usize = 40;

/// Size in bytes of a frame header (`header` word plus `length` word).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Control packet family.
pub const CONTROL_FAMILY: u32 = 0;
/// Stream metadata packet id within the control family.
pub const STREAM_METADATA_PACKET_ID: u32 = 0;
/// Connection acknowledged packet id within the control family.
pub const CONNECTION_ACK_PACKET_ID: u32 = 1;

/// Timeline packet family.
pub const TIMELINE_FAMILY: u32 = 1;
/// Timeline message directory packet id (class 0, type 0).
pub const TIMELINE_DIRECTORY_PACKET_ID: u32 = 0;
/// Timeline message packet id (class 0, type 1).
pub const TIMELINE_MESSAGE_PACKET_ID: u32 = 1;
