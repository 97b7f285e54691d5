//! # Tracepipe Transport - Connections and Dispatch
//!
//! ## Purpose
//!
//! The connection layer of the profiling pipe: a listener owning one
//! named local endpoint, the session that performs the stream metadata
//! handshake and framed send/receive over the accepted connection, and
//! the `(family, id, version)` command dispatch registry that routes
//! received packets to handlers.
//!
//! ## Architecture Role
//!
//! ```text
//! PipeListener → PipeSession → wait_for_stream_metadata
//!                     ↓
//!            loop { wait_for_packet }
//!                     ↓
//!        CommandRegistry lookup (family, id, version)
//!                     ↓
//!        CommandHandler → protocol state / TimelineDecoder
//! ```
//!
//! ## Concurrency Model
//!
//! One reader task drives each session's receive path; sends may come
//! from another task and take only the write-direction lock. The guid
//! generator in libs/types is the one component meant for many
//! producer threads at once.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod session;

pub use config::PipeServerConfig;
pub use dispatch::{CommandHandler, CommandHandlerKey, CommandRegistry};
pub use error::{Result, TransportError};
pub use handlers::{TimelineDirectoryHandler, TimelineMessageHandler, DEFAULT_THREAD_ID_SIZE};
pub use listener::PipeListener;
pub use session::{PacketDirection, PipeSession, SessionState};
