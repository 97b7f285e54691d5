//! # Tracepipe Types - Core Protocol Objects
//!
//! ## Purpose
//!
//! Pure data structures shared by every layer of the profiling pipe:
//! the owned binary [`Packet`] frame and the 64-bit profiling
//! identifier scheme ([`ProfilingGuid`] and its generator). No wire
//! rules live here - encoding and decoding belong to the codec crate,
//! socket handling to the transport crate.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/transport
//!     ↑             ↓             ↓
//! Pure Data     Wire Rules    Connections
//! Packet        Framing       Listener/Session
//! GUIDs         SwTrace       Dispatch
//! ```

pub mod guid;
pub mod packet;

pub use guid::{
    GuidGenerator, ProfilingDynamicGuid, ProfilingGuid, ProfilingStaticGuid, MIN_STATIC_GUID,
};
pub use packet::Packet;
