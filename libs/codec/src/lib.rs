//! # Tracepipe Codec - Wire Rules
//!
//! ## Purpose
//!
//! This crate contains the "rules" layer of the profiling pipe:
//! - Frame header packing and endianness-aware word encoding
//! - The SwTrace compact string encoding and its character policies
//! - Stream metadata (handshake) parsing and construction
//! - The nested timeline record decoder
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/transport
//!     ↑           ↓            ↓
//! Pure Data   Wire Rules   Connections
//! Packet      Framing      Listener/Session
//! GUIDs       SwTrace      Dispatch
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Socket management or connection handling (belongs in transport)
//! - Raw data structure definitions (belong in libs/types)
//!
//! Every multi-byte integer on a connection uses one endianness, fixed
//! at handshake time; all decoding in this crate is parameterised on
//! [`TargetEndianness`] and nothing is interpreted before the
//! connection's byte order is known, except the handshake magic itself
//! (see [`metadata::resolve_endianness`]).

pub mod constants;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod swtrace;
pub mod timeline;
pub mod wire;

pub use constants::*;
pub use error::{CodecError, CodecResult};
pub use frame::{decode_frame, encode_frame, pack_header, unpack_family, unpack_packet_id};
pub use metadata::{
    resolve_endianness, PacketVersionEntry, PacketVersionTable, StreamMetadata, Version,
};
pub use swtrace::{
    decode_string, encode_string, read_sw_trace_message, write_string, CharPolicy, SwTraceMessage,
};
pub use timeline::{
    DeclId, Entity, Event, EventClass, Label, Relationship, RelationshipType, TimelineDecoder,
    TimelineDirectory, TimelineModel, TimelineObserver,
};
pub use wire::TargetEndianness;
