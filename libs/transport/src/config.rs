//! Pipe server configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration supplied by the surrounding process to the listener
/// and the sessions it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeServerConfig {
    /// Filesystem name of the local endpoint.
    pub path: PathBuf,
    /// Forward raw packet bytes to the diagnostic log, tagged with
    /// their direction.
    pub echo_packets: bool,
    /// Remove the socket file when the listener is dropped.
    pub cleanup_on_drop: bool,
}

impl Default for PipeServerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/tracepipe.sock"),
            echo_packets: false,
            cleanup_on_drop: true,
        }
    }
}
