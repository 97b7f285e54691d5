//! Connection listener
//!
//! Owns exactly one named local endpoint. The transport serves one
//! collector at a time, so the socket is created with a backlog of
//! one: a second concurrent connection attempt is refused by the
//! operating system, not by application code.

use std::os::fd::AsRawFd;
use std::path::Path;

use futures::FutureExt;
use nix::sys::socket::{
    bind, listen, socket, AddressFamily, Backlog, SockFlag, SockType, UnixAddr,
};
use tokio::net::UnixListener;
use tracing::{debug, info};

use crate::config::PipeServerConfig;
use crate::error::{Result, TransportError};
use crate::session::PipeSession;

/// Listener for the profiling pipe endpoint.
///
/// Construction creates and binds the socket; it fails if the name is
/// already in use. Accepting yields ownership of one [`PipeSession`];
/// the listener keeps no reference to it.
#[derive(Debug)]
pub struct PipeListener {
    listener: UnixListener,
    config: PipeServerConfig,
}

impl PipeListener {
    /// Create the endpoint and start listening.
    pub fn bind(config: PipeServerConfig) -> Result<Self> {
        let bind_error = |errno: nix::errno::Errno| {
            TransportError::bind(&config.path, std::io::Error::from_raw_os_error(errno as i32))
        };

        let fd = socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::SOCK_CLOEXEC | SockFlag::SOCK_NONBLOCK,
            None,
        )
        .map_err(bind_error)?;

        let addr = UnixAddr::new(config.path.as_path()).map_err(bind_error)?;
        bind(fd.as_raw_fd(), &addr).map_err(bind_error)?;

        let backlog = Backlog::new(1).map_err(bind_error)?;
        listen(&fd, backlog).map_err(bind_error)?;

        let std_listener = std::os::unix::net::UnixListener::from(fd);
        let listener = UnixListener::from_std(std_listener)
            .map_err(|e| TransportError::io("registering the listener with the runtime", e))?;

        info!(path = %config.path.display(), "profiling pipe listening");
        Ok(Self { listener, config })
    }

    /// Wait for the collector to connect.
    pub async fn accept(&self) -> Result<PipeSession> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::io("accepting collector connection", e))?;
        debug!("collector connected");
        Ok(PipeSession::new(stream, self.config.echo_packets))
    }

    /// Poll for a pending connection without blocking.
    pub fn try_accept(&self) -> Result<Option<PipeSession>> {
        match self.listener.accept().now_or_never() {
            None => Ok(None),
            Some(Ok((stream, _addr))) => {
                debug!("collector connected");
                Ok(Some(PipeSession::new(stream, self.config.echo_packets)))
            }
            Some(Err(e)) => Err(TransportError::io("accepting collector connection", e)),
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.config.path
    }
}

impl Drop for PipeListener {
    fn drop(&mut self) {
        if self.config.cleanup_on_drop {
            let _ = std::fs::remove_file(&self.config.path);
        }
    }
}
